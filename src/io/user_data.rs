//! Signed-in user

use super::{IoContext, IoDevice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataEvent {
    pub username: String,
}

/// Username reported by the `username` block; empty until the host posts one
#[derive(Debug, Clone, Default)]
pub struct UserData {
    username: String,
}

impl UserData {
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl IoDevice for UserData {
    type Data = UserDataEvent;

    fn post_data(
        &mut self,
        data: UserDataEvent,
        _cx: &mut IoContext<'_>,
    ) {
        self.username = data.username;
    }
}
