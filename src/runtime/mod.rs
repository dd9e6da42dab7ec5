pub mod heap;
pub mod object_runtime;
pub mod runtime_error;
pub mod vm;

pub use heap::{Heap, ObjRef, Object};
pub use object_runtime::ObjectRuntime;
pub use runtime_error::{ObjectError, VmError};
pub use vm::{Execution, STACK_MAX, Step, Vm, VmConfig};
