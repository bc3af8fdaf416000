use rig::embeddings::Embedding;

/// Helper functions for converting between embeddings, `Vec<f32>` and the
/// little-endian `F32_BLOB` layout libsql stores vectors in
pub trait EmbeddingConversion {
    fn to_vec(&self) -> Vec<f32>;
    fn from_vec(vec: Vec<f32>) -> Self;
    fn to_binary(&self) -> Vec<u8>;
    fn from_binary(binary: &[u8]) -> Self;
}

impl EmbeddingConversion for Embedding {
    fn to_vec(&self) -> Vec<f32> {
        self.vec.iter().map(|f| *f as f32).collect()
    }

    fn from_vec(vec: Vec<f32>) -> Self {
        Self {
            vec: vec.into_iter().map(f64::from).collect(),
            document: String::new(),
        }
    }

    fn to_binary(&self) -> Vec<u8> {
        vector_to_blob(&self.to_vec())
    }

    fn from_binary(binary: &[u8]) -> Self {
        Self::from_vec(blob_to_vector(binary))
    }
}

impl EmbeddingConversion for Vec<f32> {
    fn to_vec(&self) -> Vec<f32> {
        self.clone()
    }

    fn from_vec(vec: Vec<f32>) -> Self {
        vec
    }

    fn to_binary(&self) -> Vec<u8> {
        vector_to_blob(self)
    }

    fn from_binary(binary: &[u8]) -> Self {
        blob_to_vector(binary)
    }
}

/// Encode a vector as a little-endian `F32_BLOB`
pub fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a little-endian `F32_BLOB`. Trailing bytes that do not form a
/// whole float are ignored.
pub fn blob_to_vector(binary: &[u8]) -> Vec<f32> {
    binary
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
