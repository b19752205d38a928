use crate::instruction::Instruction;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The Instruction Set registry (§4.E): an immutable-after-startup map
/// from instruction type to its declarative behavior (§5 "ISA registry:
/// immutable after startup").
#[derive(Default)]
pub struct InstructionSet {
    instructions: HashMap<String, Arc<dyn Instruction>>,
}

impl InstructionSet {
    pub fn new() -> Self {
        Self {
            instructions: HashMap::new(),
        }
    }

    pub fn register(&mut self, instruction_type: impl Into<String>, instruction: Arc<dyn Instruction>) {
        let instruction_type = instruction_type.into();
        debug!(instruction_type = %instruction_type, "registered instruction");
        self.instructions.insert(instruction_type, instruction);
    }

    pub fn get(&self, instruction_type: &str) -> Option<Arc<dyn Instruction>> {
        self.instructions.get(instruction_type).cloned()
    }

    pub fn contains(&self, instruction_type: &str) -> bool {
        self.instructions.contains_key(instruction_type)
    }

    /// The built-in instruction set for the generic entity kinds of the
    /// data model (§4.E), used as the pipeline's default fixture and by
    /// the demo binary.
    pub fn with_builtins() -> Self {
        let mut set = Self::new();
        crate::builtin::register_all(&mut set);
        set
    }
}
