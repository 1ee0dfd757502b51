//! Rule-based text processing: segmentation, heuristics and skill detection

pub mod blocks;
pub mod embeddings;
pub mod identity;
pub mod keyphrase;
pub mod ner;
pub mod sections;
pub mod skills;
pub mod text_processor;
pub mod vocabulary;
