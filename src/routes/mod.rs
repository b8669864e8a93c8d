mod auth;
mod health_check;

pub use auth::{
    change_password, get_current_user, login, logout, refresh_access_token, register,
    update_account_details,
};
pub use health_check::health_check;
