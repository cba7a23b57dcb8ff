//! Module abstraction
//!
//! A game module is anything that owns a [`ModuleMemory`] and answers
//! [`GameExport`] calls, issuing traps back through a [`TrapHandler`] while
//! it runs. Native code, an interpreter and a scripted test double are all
//! just different [`ModuleLoader`]s; host code does not change.

use svgame_abi::GameExport;

use crate::error::{ModuleError, TrapFault};
use crate::memory::ModuleMemory;

/// One call from the host into the module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleCall {
    pub export: GameExport,
    pub args: Vec<i32>,
    /// Out-of-band message payload delivered with `MessageReceived`
    pub payload: Option<Vec<u8>>,
}

impl ModuleCall {
    pub fn new(export: GameExport, args: &[i32]) -> Self {
        Self {
            export,
            args: args.to_vec(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: &[u8]) -> Self {
        self.payload = Some(payload.to_vec());
        self
    }

    pub fn arg(&self, n: usize) -> i32 {
        self.args.get(n).copied().unwrap_or(0)
    }
}

/// The module's only channel back into the host.
pub trait TrapHandler {
    /// Serve one trap against the calling module's memory.
    ///
    /// `Err` is fatal: the module should abandon the current call and return
    /// the fault unchanged. Later traps in the same call get the same fault,
    /// and the host drops the session even if the module returns `Ok`.
    fn trap(&mut self, memory: &mut ModuleMemory, opcode: u32, args: &[i32]) -> Result<i32, TrapFault>;
}

/// A loaded module instance.
pub trait GameModule {
    fn name(&self) -> &str;

    fn memory(&self) -> &ModuleMemory;

    fn memory_mut(&mut self) -> &mut ModuleMemory;

    /// Run one entry point to completion.
    fn call(&mut self, call: &ModuleCall, host: &mut dyn TrapHandler) -> Result<i32, ModuleError>;
}

/// Execution strategy that produces module instances.
pub trait ModuleLoader {
    type Module: GameModule;

    /// Create a fresh instance of the named module.
    fn create(&mut self, name: &str) -> Result<Self::Module, ModuleError>;

    /// Discard `old`'s state and produce a fresh instance in its place.
    fn restart(&mut self, old: Self::Module) -> Result<Self::Module, ModuleError>;
}
