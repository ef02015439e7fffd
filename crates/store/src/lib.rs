//! TwinTree Vector Store
//!
//! 하나의 레코드 집합 위에 두 개의 정렬 인덱스를 유지하는 벡터 저장소
//! (distance index: AVL, norm index: red-black)

mod embedding;
mod similarity;
mod store;
mod types;

pub use embedding::{fit_to_dimension, ByteEmbedder, Embedder};
pub use similarity::{cosine_similarity, l1_distance, l2_distance, l2_norm};
pub use store::{VectorStore, DEFAULT_RADIUS_BIAS, DEFAULT_RADIUS_SLOPE};
pub use types::{Metric, VectorRecord};
