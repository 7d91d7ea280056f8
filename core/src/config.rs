mod serde;

pub use self::serde::{ReadError, read_configuration, read_documents};
