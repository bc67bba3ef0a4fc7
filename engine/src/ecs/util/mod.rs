//! Small internal helpers shared across the ECS modules.

pub mod macros;
