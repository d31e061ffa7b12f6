pub mod close_code;
pub mod event;
pub mod opcode;
pub mod payload;

pub use self::{close_code::CloseCode, event::Event, opcode::OpCode};
