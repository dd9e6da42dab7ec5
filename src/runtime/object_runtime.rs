use crate::runtime::runtime_error::ObjectError;

/// Capabilities the interpreter needs from an object model.
///
/// Handles are reference counted by their own `Clone`/`Drop`: cloning a
/// handle is a retain and dropping one is a release. The interpreter owns one
/// strong reference per stack slot and per populated local, and hands out
/// borrows (`&Self::Handle`) whenever the runtime only needs to look.
pub trait ObjectRuntime {
    type Handle: Clone;

    /// A fresh receiver for a top-level program.
    fn new_self(&mut self) -> Self::Handle;

    /// The nil singleton.
    fn nil(&self) -> Self::Handle;

    /// The true or false singleton.
    fn boolean(&self, value: bool) -> Self::Handle;

    fn new_string(&mut self, text: &str) -> Self::Handle;

    fn new_number(&mut self, value: i64) -> Self::Handle;

    /// Integer held by a number object.
    fn number_value(&self, handle: &Self::Handle) -> Result<i64, ObjectError>;

    /// Truthiness rule used by conditional jumps.
    fn is_true(&self, handle: &Self::Handle) -> bool;

    /// Dynamic dispatch of `method` on `receiver`.
    ///
    /// The returned handle is a new strong reference owned by the caller.
    fn call(
        &mut self,
        receiver: &Self::Handle,
        method: &str,
        args: &[Self::Handle],
    ) -> Result<Self::Handle, ObjectError>;
}
