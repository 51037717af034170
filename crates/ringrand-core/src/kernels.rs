//! Kernel source registry.
//!
//! Maps a source identifier to device source text and the signatures of the
//! kernels it defines. Backends consult the registry when building; the CPU
//! backend uses only the signatures and macro requirements since its kernels
//! are native Rust.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::backend::{ArgKind, Macros};
use crate::error::{RandomError, Result};

/// Source identifier of the built-in generator kernels.
pub const RANDOM_SOURCE_ID: &str = "random";

/// xorshift1024* kernel: `(states, rounds: i32, output)`.
pub const XORSHIFT1024_KERNEL: &str = "random_xorshift1024star";

/// xorshift128+ kernel: `(states, output)`.
pub const XORSHIFT128_KERNEL: &str = "random_xorshift128plus";

/// log2 of the number of outputs one xorshift128+ work item produces.
pub const LOG_CHUNK: &str = "LOG_CHUNK";

/// Largest accepted `LOG_CHUNK`.
pub const MAX_LOG_CHUNK: i64 = 16;

/// Signature of [`XORSHIFT1024_KERNEL`].
pub const XORSHIFT1024_SIGNATURE: &[ArgKind] = &[ArgKind::Buffer, ArgKind::I32, ArgKind::Buffer];

/// Signature of [`XORSHIFT128_KERNEL`].
pub const XORSHIFT128_SIGNATURE: &[ArgKind] = &[ArgKind::Buffer, ArgKind::Buffer];

/// CUDA C source of the generator kernels.
///
/// One work item per xorshift1024* stream; `2^LOG_CHUNK` pairs per
/// xorshift128+ work item. Launch geometries must cover the work exactly.
pub const RANDOM_CUDA_SOURCE: &str = r#"
#ifndef LOG_CHUNK
#error "LOG_CHUNK must be defined"
#endif

typedef unsigned long long u64;

#define XORSHIFT1024_MULTIPLIER 1181783497276652981ULL

__device__ __forceinline__ u64 xorshift1024star_step(u64* s, int* p) {
    u64 s0 = s[*p];
    *p = (*p + 1) & 15;
    u64 s1 = s[*p];
    s1 ^= s1 << 31;
    s1 ^= s1 >> 11;
    s0 ^= s0 >> 30;
    s[*p] = s0 ^ s1;
    return s[*p] * XORSHIFT1024_MULTIPLIER;
}

extern "C" __global__ void random_xorshift1024star(
    u64* states,
    const int rounds,
    u64* output
) {
    const u64 id = (u64)blockIdx.x * blockDim.x + threadIdx.x;
    const u64 n = (u64)gridDim.x * blockDim.x;

    u64 s[16];
    #pragma unroll
    for (int i = 0; i < 16; i++) {
        s[i] = states[id * 16 + i];
    }

    int p = 0;
    u64 offs = id;
    for (int r = 0; r < rounds; r++) {
        #pragma unroll
        for (int k = 0; k < 16; k++) {
            output[offs] = xorshift1024star_step(s, &p);
            offs += n;
        }
    }

    #pragma unroll
    for (int i = 0; i < 16; i++) {
        states[id * 16 + i] = s[i];
    }
}

extern "C" __global__ void random_xorshift128plus(
    const u64* states,
    u64* output
) {
    const u64 id = (u64)blockIdx.x * blockDim.x + threadIdx.x;
    const u64 base = id << LOG_CHUNK;

    for (int i = 0; i < (1 << LOG_CHUNK); i++) {
        const u64 j = base + i;
        u64 s1 = states[j * 2];
        const u64 s0 = states[j * 2 + 1];
        s1 ^= s1 << 23;
        output[j] = (s1 ^ s0 ^ (s1 >> 18) ^ (s0 >> 5)) + s0;
    }
}
"#;

/// Declaration of one kernel in a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelDecl {
    /// Kernel entry point name.
    pub name: Cow<'static, str>,
    /// Positional argument kinds.
    pub signature: Cow<'static, [ArgKind]>,
}

/// A registered kernel source.
#[derive(Debug, Clone)]
pub struct KernelSource {
    /// Source identifier.
    pub id: Cow<'static, str>,
    /// CUDA C text.
    pub cuda: Cow<'static, str>,
    /// Kernels defined by the source.
    pub kernels: Vec<KernelDecl>,
    /// Macros that must be supplied at build time.
    pub required_macros: Vec<Cow<'static, str>>,
}

impl KernelSource {
    /// Declaration of the kernel called `name`.
    pub fn kernel(&self, name: &str) -> Option<&KernelDecl> {
        self.kernels.iter().find(|k| k.name == name)
    }

    /// Check that every required macro is present.
    pub fn check_macros(&self, macros: &Macros) -> Result<()> {
        for name in &self.required_macros {
            if !macros.contains_key::<str>(name) {
                return Err(RandomError::build(
                    self.id.to_string(),
                    format!("macro {} must be defined", name),
                ));
            }
        }
        if let Some(&chunk) = macros.get(LOG_CHUNK) {
            if !(0..=MAX_LOG_CHUNK).contains(&chunk) {
                return Err(RandomError::build(
                    self.id.to_string(),
                    format!("{} = {} is outside 0..={}", LOG_CHUNK, chunk, MAX_LOG_CHUNK),
                ));
            }
        }
        Ok(())
    }

    /// CUDA text with `#define` lines for `macros` prepended.
    pub fn expand_cuda(&self, macros: &Macros) -> String {
        expand_macros(&self.cuda, macros)
    }
}

/// Prepend one `#define NAME VALUE` line per macro, in name order.
pub fn expand_macros(source: &str, macros: &Macros) -> String {
    let mut out = String::with_capacity(source.len() + macros.len() * 32);
    for (name, value) in macros {
        out.push_str(&format!("#define {} {}\n", name, value));
    }
    out.push_str(source);
    out
}

/// Source identifier to source mapping.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, KernelSource>,
}

impl SourceRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `"random"` source.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(random_source());
        registry
    }

    /// Add or replace a source.
    pub fn register(&mut self, source: KernelSource) {
        self.sources.insert(source.id.to_string(), source);
    }

    /// Look up a source.
    pub fn get(&self, source_id: &str) -> Result<&KernelSource> {
        self.sources
            .get(source_id)
            .ok_or_else(|| RandomError::Lookup(format!("no kernel source '{}'", source_id)))
    }

    /// Registered source identifiers.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

/// The built-in generator source.
pub fn random_source() -> KernelSource {
    KernelSource {
        id: Cow::Borrowed(RANDOM_SOURCE_ID),
        cuda: Cow::Borrowed(RANDOM_CUDA_SOURCE),
        kernels: vec![
            KernelDecl {
                name: Cow::Borrowed(XORSHIFT1024_KERNEL),
                signature: Cow::Borrowed(XORSHIFT1024_SIGNATURE),
            },
            KernelDecl {
                name: Cow::Borrowed(XORSHIFT128_KERNEL),
                signature: Cow::Borrowed(XORSHIFT128_SIGNATURE),
            },
        ],
        required_macros: vec![Cow::Borrowed(LOG_CHUNK)],
    }
}

/// Macro map with only `LOG_CHUNK` set.
pub fn chunk_macros(log_chunk: u32) -> Macros {
    let mut macros = Macros::new();
    macros.insert(LOG_CHUNK.to_string(), log_chunk as i64);
    macros
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = SourceRegistry::builtin();
        let source = registry.get(RANDOM_SOURCE_ID).unwrap();
        assert_eq!(
            &*source.kernel(XORSHIFT1024_KERNEL).unwrap().signature,
            XORSHIFT1024_SIGNATURE
        );
        assert!(source.kernel("random_mt19937").is_none());
        assert!(matches!(
            registry.get("missing"),
            Err(RandomError::Lookup(_))
        ));
    }

    #[test]
    fn test_source_defines_every_kernel() {
        let source = random_source();
        for kernel in &source.kernels {
            assert!(source.cuda.contains(&format!("void {}(", kernel.name)));
        }
    }

    #[test]
    fn test_expand_macros() {
        let mut macros = chunk_macros(4);
        macros.insert("EXTRA".to_string(), -1);
        let expanded = expand_macros("body", &macros);
        assert_eq!(expanded, "#define EXTRA -1\n#define LOG_CHUNK 4\nbody");
    }

    #[test]
    fn test_check_macros() {
        let source = random_source();
        source.check_macros(&chunk_macros(4)).unwrap();

        let err = source.check_macros(&Macros::new()).unwrap_err();
        assert!(err.is_build_error());

        let err = source.check_macros(&chunk_macros(40)).unwrap_err();
        assert!(err.to_string().contains("LOG_CHUNK"));
    }
}
