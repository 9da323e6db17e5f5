#![no_main]

use libfuzzer_sys::fuzz_target;
use queuekit::ds::classifier::Classifier;

// Property-check the classifier against the rank definition:
// classify(k) = #{splitters s : s < k}.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // first up to 63 bytes become the splitter set, the rest are subjects
    let split_len = (data[0] as usize % 63 + 1).min(data.len() - 1);
    let mut splitters: Vec<i64> = data[1..=split_len].iter().map(|&b| i64::from(b)).collect();
    splitters.sort_unstable();
    splitters.dedup();

    let classifier = Classifier::with_splitters(&splitters);
    assert!(classifier.valid());
    assert_eq!(classifier.num_buckets(), splitters.len() + 1);

    for &b in &data[split_len + 1..] {
        let key = i64::from(b);
        let class = classifier.classify_key(key);
        let expected = splitters.iter().filter(|&&s| s < key).count();
        assert_eq!(class, expected);
    }
});
