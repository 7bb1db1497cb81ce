//! InMemory Membership Oracle 用のシードファイル
//!
//! ```json
//! {
//!   "rooms": [
//!     {
//!       "id": "6f1c5d0e-2b1a-4a59-9a53-0b7f2d7c1e11",
//!       "members": [{ "user_id": 1, "display_name": "alice" }]
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{DisplayName, Member, RoomId, UserId};
use crate::infrastructure::repository::InMemoryMembershipOracle;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse seed data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid seed data: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedMember {
    pub user_id: i64,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRoom {
    pub id: String,
    #[serde(default)]
    pub members: Vec<SeedMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub rooms: Vec<SeedRoom>,
}

impl SeedData {
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// 全エントリを検証してから `oracle` にルームを読み込む
    ///
    /// 不正なエントリが 1 つでもあれば何も読み込まない。読み込んだルーム数を返す。
    pub async fn apply(&self, oracle: &InMemoryMembershipOracle) -> Result<usize, SeedError> {
        let mut rooms = Vec::with_capacity(self.rooms.len());
        for room in &self.rooms {
            let room_id = RoomId::parse(&room.id)
                .map_err(|e| SeedError::Invalid(e.to_string()))?;
            let members = room
                .members
                .iter()
                .map(|m| {
                    DisplayName::new(m.display_name.clone())
                        .map(|name| Member::new(UserId::new(m.user_id), name))
                        .map_err(|e| {
                            SeedError::Invalid(format!("room {}, user {}: {}", room.id, m.user_id, e))
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rooms.push((room_id, members));
        }

        let loaded = rooms.len();
        for (room_id, members) in rooms {
            oracle.create_room(room_id).await;
            for member in members {
                oracle.add_member(room_id, member).await;
            }
        }
        Ok(loaded)
    }
}
