//! Randomized equivalence between the CPU device and the host reference.

use proptest::prelude::*;
use ringrand::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn xorshift1024_device_matches_reference(
        seed in any::<u64>(),
        num_states in 1usize..40,
        rounds in 1usize..4,
        max_local_log in 0u32..6,
    ) {
        let config = RandomConfig::default().with_max_local_size(1 << max_local_log);
        let states = StdSeedSource::new(seed).state_words(num_states * 16).unwrap();
        let device = CpuDevice::new();

        let on_device = run_xorshift1024star(Some(&device), &states, rounds, &config).unwrap();
        let on_host = run_xorshift1024star(None, &states, rounds, &config).unwrap();

        prop_assert_eq!(on_device.output.len(), num_states * 16 * rounds);
        prop_assert_eq!(first_mismatch(&on_device.output, &on_host.output), None);
        prop_assert_eq!(on_device.states, on_host.states);
    }

    #[test]
    fn xorshift128_device_matches_reference(
        seed in any::<u64>(),
        log_chunk in 0u32..5,
        chunks in 1usize..20,
    ) {
        let config = RandomConfig::default().with_log_chunk(log_chunk);
        let outputs = chunks << log_chunk;
        let states = StdSeedSource::new(seed).state_words(outputs * 2).unwrap();
        let device = CpuDevice::new();

        let on_device = run_xorshift128plus(Some(&device), &states, &config).unwrap();
        let on_host = run_xorshift128plus(None, &states, &config).unwrap();

        prop_assert_eq!(on_device.len(), outputs);
        prop_assert_eq!(first_mismatch(&on_device, &on_host), None);
    }

    #[test]
    fn uniform_bytes_do_not_depend_on_backend(
        seed in any::<u64>(),
        num_states in 1usize..8,
        output_bytes in 1usize..4000,
    ) {
        let config = RandomConfig::default().with_seed(seed);
        let device = CpuDevice::new();

        let mut on_device = Uniform::with_config(num_states, output_bytes, config.clone()).unwrap();
        on_device.initialize(Some(&device)).unwrap();
        on_device.run().unwrap();

        let mut on_host = Uniform::with_config(num_states, output_bytes, config).unwrap();
        on_host.initialize(None).unwrap();
        on_host.run().unwrap();

        let bytes = on_device.output_view().unwrap().to_vec();
        prop_assert_eq!(bytes.len(), output_bytes);
        prop_assert_eq!(bytes.as_slice(), on_host.output_view().unwrap());
    }
}
