pub mod backend;
pub mod graphics;
pub mod layout;
pub mod table;
pub mod text;
