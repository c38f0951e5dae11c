pub mod invitation;
pub mod licence;
pub mod order;
