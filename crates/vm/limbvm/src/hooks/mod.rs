pub mod address_policy;
pub mod default_hook;
pub mod hook;
pub mod overrides;
pub mod tracer;

pub use address_policy::{AddressPolicy, StandardAddressPolicy};
pub use default_hook::DefaultHook;
pub use hook::{Hook, get_hooks};
pub use overrides::{
    FrameOutcomeHook, OpcodeOverride, OverrideTable, PrecompileOutput, PrecompileSet, SelfDestructHook,
    StandardPrecompiles,
};
pub use tracer::{LoggingTracer, NoopTracer, Tracer};
