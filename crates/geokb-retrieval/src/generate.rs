use crate::BoxFuture;
use crate::error::Result;

/// Text generation backend used to answer a question from an assembled prompt.
pub trait Generator: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>>;
}
