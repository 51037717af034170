//! CUDA parity tests
//!
//! Every kernel is run on the GPU and on the CPU backend from the same seed
//! snapshot; the outputs must match word for word. Tests return early when no
//! device is present.

#![cfg(feature = "cuda")]

use ringrand_core::prelude::*;
use ringrand_cpu::CpuDevice;
use ringrand_cuda::{is_cuda_available, CudaDevice};

macro_rules! skip_without_cuda {
    () => {
        if !is_cuda_available() {
            println!("No CUDA devices found, skipping test");
            return;
        }
    };
}

fn config() -> RandomConfig {
    RandomConfig::default().with_ptx_cache(false)
}

#[test]
fn test_xorshift1024_matches_reference() {
    skip_without_cuda!();
    let device = CudaDevice::with_config(0, &config()).unwrap();

    let mut seeds = StdSeedSource::new(1);
    for (num_states, rounds) in [(1, 1), (5, 3), (64, 2), (96, 1)] {
        let states = seeds.state_words(num_states * 16).unwrap();
        let gpu = run_xorshift1024star(Some(&device), &states, rounds, &config()).unwrap();
        let host = run_xorshift1024star(None, &states, rounds, &config()).unwrap();
        assert_eq!(count_mismatches(&gpu.output, &host.output), 0);
        assert_eq!(gpu.states, host.states);
    }
}

#[test]
fn test_xorshift128_matches_reference() {
    skip_without_cuda!();
    let device = CudaDevice::with_config(0, &config()).unwrap();

    let states = StdSeedSource::new(2).state_words(4096).unwrap();
    let gpu = run_xorshift128plus(Some(&device), &states, &config()).unwrap();
    let host = run_xorshift128plus(None, &states, &config()).unwrap();
    assert_eq!(gpu.len(), 2048);
    assert_eq!(first_mismatch(&gpu, &host), None);
}

#[test]
fn test_matches_cpu_backend() {
    skip_without_cuda!();
    let cuda = CudaDevice::with_config(0, &config()).unwrap();
    let cpu = CpuDevice::new();

    let states = StdSeedSource::new(3).state_words(32 * 16).unwrap();
    let a = run_xorshift1024star(Some(&cuda), &states, 4, &config()).unwrap();
    let b = run_xorshift1024star(Some(&cpu), &states, 4, &config()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_uniform_matches_host() {
    skip_without_cuda!();
    let device = CudaDevice::with_config(0, &config()).unwrap();

    let mut on_gpu = Uniform::with_config(256, 100_000, config()).unwrap();
    on_gpu.initialize(Some(&device)).unwrap();
    on_gpu.run().unwrap();

    let mut on_host = Uniform::with_config(256, 100_000, config()).unwrap();
    on_host.initialize(None).unwrap();
    on_host.run().unwrap();

    assert_eq!(on_gpu.output_view().unwrap(), on_host.output_view().unwrap());
}

#[test]
fn test_missing_log_chunk_is_build_error() {
    skip_without_cuda!();
    let device = CudaDevice::with_config(0, &config()).unwrap();
    let err = device.build(RANDOM_SOURCE_ID, &Macros::new()).err().unwrap();
    assert!(err.is_build_error());
}

#[test]
fn test_pending_event_waits() {
    skip_without_cuda!();
    let device = CudaDevice::with_config(0, &config()).unwrap();
    let program = device.build(RANDOM_SOURCE_ID, &chunk_macros(0)).unwrap();
    let mut kernel = program.get_kernel(XORSHIFT128_KERNEL).unwrap();

    let states = device.alloc(2 * 8).unwrap();
    let output = device.alloc(8).unwrap();
    kernel
        .set_args(vec![KernelArg::Buffer(states), KernelArg::Buffer(output)])
        .unwrap();
    let event = kernel.launch(LaunchGeometry::flat(1), true).unwrap();
    assert!(event.is_pending());
    event.wait().unwrap();
}
