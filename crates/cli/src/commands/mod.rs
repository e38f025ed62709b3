pub mod tokens;
pub mod users;

pub use tokens::{handle_tokens_command, TokensCommands};
pub use users::{handle_users_command, UsersCommands};
