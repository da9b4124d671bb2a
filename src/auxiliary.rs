mod completion;

pub use completion::{CompletionArgs, handle as handle_completion};
