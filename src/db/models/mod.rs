pub mod change_row;

pub use change_row::ChangeRow;
