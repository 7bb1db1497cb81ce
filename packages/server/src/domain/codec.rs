//! ルームソケットに書き出すフレームのエンコード境界
//!
//! ワイヤ形式 (JSON など) は Infrastructure 層が決める。UseCase 層はこの trait
//! を通してフレームを受け取るだけで、DTO を直接参照しない。

use super::{EncodeError, Message};

/// メッセージをルームソケット向けのテキストフレームに変換する
#[cfg_attr(test, mockall::automock)]
pub trait FrameEncoder: Send + Sync {
    /// 永続化後 (または永続化に失敗した) のメッセージを 1 フレームに変換
    ///
    /// # Arguments
    ///
    /// * `message` - 配信するメッセージ。`id` は永続化に失敗した場合 `None`
    ///
    /// # Returns
    ///
    /// ソケットにそのまま書き出せるテキストフレーム
    fn encode_message(&self, message: &Message) -> Result<String, EncodeError>;
}
