//!  Storage is organized through [storage::JsonStorage].
//!  The basic idea is:
//!   - There is a directory with all the data.
//!   - Blocks, categories and cached statistics each live in their own json-lines file.
//!   - Files are rewritten as a whole under an exclusive lock.

pub mod entities;
pub mod storage;
