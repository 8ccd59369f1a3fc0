use std::marker::PhantomData;

/// Trait representing event callbacks (e.g. speech started/stopped).
/// Callbacks run synchronously on the producer thread that raised the event, so they must be
/// fast and must not block.
pub trait Callback {
    type Argument;
    fn call(&mut self, arg: Self::Argument);
}

/// Encapsulates a basic FnMut(T) callback for components that accept event callbacks.
#[repr(C)]
pub struct FnCallback<T, CB: FnMut(T)> {
    callback: CB,
    _marker: PhantomData<T>,
}
impl<T, CB: FnMut(T)> FnCallback<T, CB> {
    pub fn new(callback: CB) -> Self {
        Self {
            callback,
            _marker: PhantomData,
        }
    }
}

impl<T, CB: FnMut(T)> Callback for FnCallback<T, CB> {
    type Argument = T;
    fn call(&mut self, arg: T) {
        (self.callback)(arg);
    }
}

/// To indicate "None" in components that expect a callback.
#[repr(C)]
pub struct Nop<T> {
    _marker: PhantomData<T>,
}

impl<T> Nop<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Nop<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T> Callback for Nop<T> {
    type Argument = T;
    fn call(&mut self, _arg: T) {}
}
