//! PTX compilation and caching.
//!
//! ```ignore
//! use ringrand_core::kernels::RANDOM_SOURCE_ID;
//! use ringrand_cuda::compile::{compile_cached, PtxCache};
//!
//! let cache = PtxCache::from_config(&config);
//! let ptx = compile_cached(&cache, RANDOM_SOURCE_ID, &expanded_source, "sm_86")?;
//! ```

mod cache;

pub use cache::{
    arch_tag, hash_source, PtxCache, PtxCacheError, PtxCacheResult, PtxCacheStats, PtxKey,
    CACHE_VERSION,
};

/// Compile CUDA C to PTX with NVRTC.
///
/// Any compiler diagnostic, including an `#error` directive, becomes a
/// [`RandomError::Build`](ringrand_core::error::RandomError::Build) for
/// `source_id`.
#[cfg(feature = "cuda")]
pub fn compile_ptx(source_id: &str, cuda_source: &str) -> ringrand_core::error::Result<String> {
    let ptx = cudarc::nvrtc::compile_ptx(cuda_source).map_err(|e| {
        ringrand_core::error::RandomError::build(source_id, format!("NVRTC: {}", e))
    })?;
    Ok(ptx.to_src().to_string())
}

/// Compile through `cache`: a hit skips NVRTC, a miss compiles and stores.
///
/// Cache failures are logged and otherwise ignored.
#[cfg(feature = "cuda")]
pub fn compile_cached(
    cache: &PtxCache,
    source_id: &str,
    cuda_source: &str,
    arch: &str,
) -> ringrand_core::error::Result<String> {
    let key = PtxKey::new(cuda_source, arch);
    match cache.get(&key) {
        Ok(Some(ptx)) => return Ok(ptx),
        Ok(None) => {}
        Err(e) => tracing::warn!("Ignoring PTX cache entry: {}", e),
    }

    tracing::debug!(
        "Compiling '{}' for {} ({})",
        source_id,
        arch,
        &key.source_hash[..8]
    );
    let ptx = compile_ptx(source_id, cuda_source)?;

    if let Err(e) = cache.put(&key, &ptx) {
        tracing::warn!("Failed to cache PTX: {}", e);
    }
    Ok(ptx)
}
