//! Auth Commands

use uuid::Uuid;

/// 注册命令
#[derive(Debug, Clone)]
pub struct Register {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

/// 密码登录命令
#[derive(Debug, Clone)]
pub struct Login {
    pub email: String,
    pub password: String,
}

/// Google 登录命令
#[derive(Debug, Clone)]
pub struct GoogleLogin {
    pub id_token: String,
}

/// 刷新令牌命令（轮换）
#[derive(Debug, Clone)]
pub struct RefreshSession {
    pub refresh_token: String,
}

/// 登出命令
#[derive(Debug, Clone)]
pub struct Logout {
    pub refresh_token: String,
}

/// 更新个人资料命令
#[derive(Debug, Clone)]
pub struct UpdateProfile {
    pub user_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// 修改密码命令
#[derive(Debug, Clone)]
pub struct ChangePassword {
    pub user_id: Uuid,
    pub current_password: String,
    pub new_password: String,
}
