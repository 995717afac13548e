use std::sync::Arc;

/// A mocked binding method: a replaceable closure that records the arguments of every call.
pub struct MockMethod<I, R> {
    closure: Arc<dyn Fn(I) -> R + Send + Sync>,
    calls: Vec<I>,
}

pub type MockClosureSignature<I, R> = Box<dyn Fn(I) -> R + Send + Sync>;

impl<I, R> std::default::Default for MockMethod<I, R> {
    fn default() -> Self {
        Self::new_unimplemented()
    }
}

impl<I, R> MockMethod<I, R> {
    pub fn new_unimplemented() -> Self {
        Self::new_fixed(Box::new(|_| unimplemented!()))
    }

    pub fn new_default() -> Self
    where
        R: Default,
    {
        Self::new_fixed(Box::new(|_| R::default()))
    }

    pub fn new_fixed(closure: MockClosureSignature<I, R>) -> Self {
        Self {
            closure: Arc::from(closure),
            calls: vec![],
        }
    }

    pub fn call(&mut self, args: I) -> R
    where
        I: Clone,
    {
        self.calls.push(args.clone());
        (self.closure)(args)
    }

    /// Record a call, and return the closure to run for it. The caller can then run the closure
    /// without holding the mock VM, which a closure that blocks needs.
    pub fn record(&mut self, args: &I) -> Arc<dyn Fn(I) -> R + Send + Sync>
    where
        I: Clone,
    {
        self.calls.push(args.clone());
        self.closure.clone()
    }

    pub fn is_called(&self) -> bool {
        self.call_count() > 0
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    /// Arguments of every call so far, oldest first.
    pub fn calls(&self) -> &[I] {
        &self.calls
    }

    pub fn last_call(&self) -> Option<&I> {
        self.calls.last()
    }
}
