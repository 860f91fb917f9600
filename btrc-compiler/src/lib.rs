// btrc code generation: analyzed AST → tree IR → portable C text.
//
// The pipeline is strictly one-way. `gen` walks the resolved program
// and fills one `IrModule`; `optimizer` rewrites the module in place
// (dead-helper elimination); `emitter` serializes it.

pub mod emitter;
pub mod gen;
pub mod ir;
pub mod optimizer;

pub use emitter::CEmitter;
pub use gen::{generate_ir, IrGenerator};
pub use ir::IrModule;
pub use optimizer::optimize;
