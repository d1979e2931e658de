// Engine functions are organized by concern
pub mod arithmetic;
pub mod calculus;
pub mod latex;
pub mod numeric;
pub mod solve;
