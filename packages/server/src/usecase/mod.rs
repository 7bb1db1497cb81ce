//! UseCase 層
//!
//! ハンドシェイクの認可、ソケットの登録・解除、メッセージのファンアウト、
//! 通知ブリッジを、ドメイン層の trait だけを使って組み立てる。

mod authorize_connection;
mod connect_session;
mod disconnect_session;
mod error;
mod forward_notifications;
mod inspect_registry;
mod send_message;

pub use authorize_connection::AuthorizeConnectionUseCase;
pub use connect_session::ConnectSessionUseCase;
pub use disconnect_session::DisconnectSessionUseCase;
pub use error::HandshakeError;
pub use forward_notifications::{ForwardExit, ForwardNotificationsUseCase, ResubscribePolicy};
pub use inspect_registry::InspectRegistryUseCase;
pub use send_message::{FanOutReport, SendMessageUseCase};
