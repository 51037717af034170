//! Cross-backend equivalence on the CPU device.
//!
//! The CPU device runs the kernels work item by work item with device
//! indexing, so these tests exercise launch geometry, argument binding and
//! buffer synchronization without a GPU.

use std::sync::Arc;

use ringrand::prelude::*;

fn config() -> RandomConfig {
    RandomConfig::default().with_log_chunk(4)
}

#[test]
fn test_xorshift1024_five_streams_three_rounds() {
    let device = CpuDevice::new();
    let states = StdSeedSource::new(11).state_words(5 * 16).unwrap();

    let on_device = run_xorshift1024star(Some(&device), &states, 3, &config()).unwrap();
    let on_host = run_xorshift1024star(None, &states, 3, &config()).unwrap();

    assert_eq!(on_device.output.len(), 240);
    assert_eq!(count_mismatches(&on_device.output, &on_host.output), 0);
    assert_eq!(on_device.states, on_host.states);
}

#[test]
fn test_xorshift1024_counting_state_on_device() {
    let device = CpuDevice::new();
    let states: Vec<u64> = (1..=16).collect();
    let run = run_xorshift1024star(Some(&device), &states, 1, &config()).unwrap();

    assert_eq!(run.output[0], 0xc056_2e31_b467_f91f);
    assert_eq!(run.output[5], 0xc791_485a_5b50_0000);
    assert_eq!(run.output[15], 0x9cb4_e749_e617_8fa5);
    assert_eq!(run.states[0], 0x8_0100_0031);
    assert_eq!(run.states[4], 0xd);
    assert_eq!(run.states[15], 0x8_8110_0012);
}

#[test]
fn test_xorshift128_4096_words() {
    let device = CpuDevice::new();
    let states = StdSeedSource::new(12).state_words(4096).unwrap();

    let on_device = run_xorshift128plus(Some(&device), &states, &config()).unwrap();
    let on_host = run_xorshift128plus(None, &states, &config()).unwrap();

    assert_eq!(on_device.len(), 2048);
    assert_eq!(first_mismatch(&on_device, &on_host), None);
}

#[test]
fn test_xorshift128_overflow_wraps() {
    let device = CpuDevice::new();
    let states = vec![u64::MAX; 32];
    let output = run_xorshift128plus(Some(&device), &states, &config()).unwrap();
    assert!(output.iter().all(|&v| v == 0xf800_0000_007f_ffdf));
}

#[test]
fn test_xorshift128_chunk_must_divide_output() {
    let device = CpuDevice::new();
    let states = vec![1u64; 2 * 24];
    let err = run_xorshift128plus(Some(&device), &states, &config()).unwrap_err();
    assert!(matches!(err, RandomError::InvalidConfig(_)));

    // The host path has no chunking constraint.
    assert_eq!(
        run_xorshift128plus(None, &states, &config()).unwrap().len(),
        24
    );
}

#[test]
fn test_oversized_log_chunk_is_invalid_config() {
    let device = CpuDevice::new();
    let config = RandomConfig::default().with_log_chunk(64);

    let err = run_xorshift128plus(Some(&device), &[1; 4], &config).unwrap_err();
    assert!(matches!(err, RandomError::InvalidConfig(_)));

    let err = run_xorshift1024star(Some(&device), &[1; 16], 1, &config).unwrap_err();
    assert!(matches!(err, RandomError::InvalidConfig(_)));
}

#[test]
fn test_geometry_limit_does_not_change_output() {
    let device = CpuDevice::new();
    let states = StdSeedSource::new(13).state_words(48 * 16).unwrap();

    let wide = run_xorshift1024star(Some(&device), &states, 2, &config()).unwrap();
    let narrow = run_xorshift1024star(
        Some(&device),
        &states,
        2,
        &config().with_max_local_size(1),
    )
    .unwrap();
    assert_eq!(wide, narrow);
}

#[test]
fn test_uniform_device_matches_host() {
    let device = CpuDevice::new();

    let mut on_device = Uniform::with_config(12, 5000, config()).unwrap();
    on_device.initialize(Some(&device)).unwrap();
    let mut on_host = Uniform::with_config(12, 5000, config()).unwrap();
    on_host.initialize(None).unwrap();

    for _ in 0..3 {
        on_device.run().unwrap();
        on_host.run().unwrap();
        assert_eq!(
            on_device.output_view().unwrap(),
            on_host.output_view().unwrap()
        );
    }
    assert_eq!(on_device.states().unwrap(), on_host.states().unwrap());
}

#[test]
fn test_uniform_with_explicit_states() {
    let device = CpuDevice::new();
    let states: Vec<u64> = (0..4 * 16).map(|i| i * 0x9e37_79b9 + 1).collect();

    let mut uniform = Uniform::new(4, 512).unwrap();
    uniform.set_states(states.clone()).unwrap();
    uniform.initialize(Some(&device)).unwrap();
    uniform.run().unwrap();

    let expected = run_xorshift1024star(None, &states, 1, &config()).unwrap();
    assert_eq!(uniform.output().unwrap(), expected.output.as_slice());
}

#[test]
fn test_mirrored_buffer_round_trip_through_device() {
    let device = CpuDevice::new();
    let mut buffer = MirroredBuffer::from_vec("words", vec![1u64, 2, 3, 4]);
    buffer.initialize(Some(&device)).unwrap();
    assert_eq!(buffer.backend(), Some(Backend::Cpu));

    buffer.map_write().unwrap()[2] = 30;
    assert!(buffer.is_host_dirty());
    buffer.unmap().unwrap();
    assert!(!buffer.is_host_dirty());

    // Overwrite the host copy without pushing, then pull the device copy back.
    buffer.map_invalidate().unwrap().fill(0);
    let devmem = buffer.devmem().unwrap();
    let mut raw = [0u8; 32];
    devmem.copy_to_host(&mut raw).unwrap();
    assert_eq!(&raw[16..24], &30u64.to_ne_bytes());
    assert_eq!(buffer.map_read().unwrap(), &[1, 2, 30, 4]);
}

#[test]
fn test_mirrored_buffer_length_change_is_state_error() {
    let device = CpuDevice::new();
    let mut buffer = MirroredBuffer::from_vec("words", vec![0u64; 4]);
    buffer.initialize(Some(&device)).unwrap();
    buffer.set(vec![0u64; 5]);
    assert!(buffer.push().unwrap_err().is_state_error());
    assert!(buffer.map_read().unwrap_err().is_state_error());
}

#[test]
fn test_empty_buffer_cannot_go_to_device() {
    let device = CpuDevice::new();
    let mut buffer = MirroredBuffer::<u64>::new("empty");
    assert!(buffer.initialize(Some(&device)).unwrap_err().is_state_error());
}

#[test]
fn test_argument_mismatches() {
    let device = CpuDevice::new();
    let program = device.build(RANDOM_SOURCE_ID, &config().macros()).unwrap();
    let mut kernel = program.get_kernel(XORSHIFT128_KERNEL).unwrap();
    let states = device.alloc(64).unwrap();

    let err = kernel
        .set_args(vec![
            KernelArg::Buffer(Arc::clone(&states)),
            KernelArg::Buffer(Arc::clone(&states)),
        ])
        .unwrap_err();
    assert!(matches!(err, RandomError::ArgumentMismatch { .. }));

    let err = kernel
        .set_args(vec![KernelArg::Buffer(states), KernelArg::U32(0)])
        .unwrap_err();
    assert!(matches!(err, RandomError::ArgumentMismatch { .. }));
}

#[test]
fn test_missing_log_chunk_is_build_error() {
    let device = CpuDevice::new();
    let err = device.build(RANDOM_SOURCE_ID, &Macros::new()).err().unwrap();
    assert!(err.is_build_error());
    assert!(err.to_string().contains("LOG_CHUNK"));
}
