pub mod chat_completion;
