//! Protocol Module
//!
//! The command surface: parsing a line of input into a validated command,
//! the replies commands produce, and the fixed error catalog.
//!
//! ## Commands
//! ```text
//! SET key value [EX seconds | PX milliseconds]
//! GET key
//! DEL key [key ...]
//! TTL key
//! EXPIRE key seconds
//! ZADD key score member [score member ...]
//! ZRANGE key start stop [WITHSCORES]
//! ZRANK key member
//! ```
//!
//! Verbs and option keywords are case-insensitive. Arity and integer
//! arguments are checked before anything touches the store.

mod command;
mod errors;
mod response;

pub use command::{parse_line, Command, CommandType};
pub use errors::CommandError;
pub use response::Reply;
