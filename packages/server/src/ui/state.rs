//! Shared application state.

use std::sync::Arc;

use crate::{
    config::RelayConfig,
    usecase::{
        AuthorizeConnectionUseCase, ConnectSessionUseCase, DisconnectSessionUseCase,
        ForwardNotificationsUseCase, InspectRegistryUseCase, SendMessageUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// AuthorizeConnectionUseCase（ハンドシェイク認可のユースケース）
    pub authorize_connection_usecase: Arc<AuthorizeConnectionUseCase>,
    /// ConnectSessionUseCase（ソケット登録のユースケース）
    pub connect_session_usecase: Arc<ConnectSessionUseCase>,
    /// DisconnectSessionUseCase（ソケット登録解除のユースケース）
    pub disconnect_session_usecase: Arc<DisconnectSessionUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// ForwardNotificationsUseCase（通知転送のユースケース）
    pub forward_notifications_usecase: Arc<ForwardNotificationsUseCase>,
    /// InspectRegistryUseCase（Registry 状態取得のユースケース）
    pub inspect_registry_usecase: Arc<InspectRegistryUseCase>,
    pub config: RelayConfig,
}
