pub mod wikipedia;

pub use wikipedia::WikipediaClient;
