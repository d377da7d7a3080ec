use stats::{GroupId, Normalizer, ResourceMirror, StatsMirror};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn mirror_holds_identity_until_first_push() {
    let norm = Normalizer::new("s_norm", 3);
    let mirror = ResourceMirror::for_normalizer(&norm);
    let snap = mirror.snapshot();
    assert_eq!(snap.version, 0);
    assert_eq!(snap.count, 0);
    assert_eq!(snap.mean, vec![0.0; 3]);
    assert_eq!(snap.std, vec![1.0; 3]);
}

#[test]
fn mutations_invalidate_and_sync_refreshes() {
    let mut norm = Normalizer::new("s_norm", 2);
    let mirror = ResourceMirror::for_normalizer(&norm);
    norm.attach_mirror(mirror.clone());
    assert!(!norm.mirror_is_current());

    assert_eq!(norm.sync_mirror(), 1);
    assert!(norm.mirror_is_current());

    norm.update(&[[1.0, 2.0], [3.0, 6.0]]).unwrap();
    assert!(!norm.mirror_is_current());
    // not auto-refreshed
    assert_eq!(mirror.snapshot().count, 0);

    norm.sync_mirror();
    let snap = mirror.snapshot();
    assert_eq!(snap.count, 2);
    assert_eq!(snap.mean, norm.mean());
    assert_eq!(snap.std, norm.std());
    assert_eq!(
        mirror.normalize(&[2.0, 4.0]).unwrap(),
        norm.normalize(&[2.0, 4.0]).unwrap()
    );
    assert_eq!(
        mirror.unnormalize(&[1.0, -1.0]).unwrap(),
        norm.unnormalize(&[1.0, -1.0]).unwrap()
    );

    norm.set_mean_std(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
    assert!(!norm.mirror_is_current());
    norm.sync_mirror();
    norm.load(&norm.save()).unwrap();
    assert!(!norm.mirror_is_current());
}

#[test]
fn failed_update_keeps_mirror_current() {
    let mut norm = Normalizer::new("s_norm", 2);
    norm.attach_mirror(ResourceMirror::for_normalizer(&norm));
    norm.sync_mirror();
    assert!(norm.update(&[vec![1.0]]).is_err());
    assert!(norm.mirror_is_current());
}

#[test]
fn mirror_respects_excluded_dimensions() {
    let norm = Normalizer::with_options("g_norm", 2, Some(vec![GroupId(0), GroupId::NONE]), 0.02, 1.0)
        .unwrap();
    let mirror = ResourceMirror::for_normalizer(&norm);
    assert_eq!(mirror.normalize(&[5.0, 5.0]).unwrap(), vec![1.0, 5.0]);
}

#[test]
fn mismatched_push_is_ignored() {
    let mirror = ResourceMirror::new("a_norm", 2, f64::INFINITY);
    assert!(!mirror.sync(4, &[1.0], &[1.0]));
    assert_eq!(mirror.version(), 0);
    assert!(mirror.sync(4, &[1.0, 2.0], &[1.0, 1.0]));
    assert_eq!(mirror.version(), 1);
}

#[test]
fn wrong_dimension_mirror_is_never_current() {
    let mut norm = Normalizer::new("s_norm", 2);
    let good = ResourceMirror::for_normalizer(&norm);
    let other = Arc::new(ResourceMirror::new("other", 3, f64::INFINITY));
    norm.attach_mirror(good.clone());
    norm.attach_mirror(other.clone());

    norm.update(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
    assert_eq!(norm.sync_mirror(), 1);
    assert!(!norm.mirror_is_current());
    assert_eq!(good.snapshot().count, 2);
    assert_eq!(other.version(), 0);
}

#[test]
fn concurrent_readers_never_see_a_torn_snapshot() {
    let mirror = Arc::new(ResourceMirror::new("s_norm", 64, f64::INFINITY));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let mirror = Arc::clone(&mirror);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut observed = 0_u64;
                while !done.load(Ordering::Acquire) {
                    let snap = mirror.snapshot();
                    if snap.version == 0 {
                        continue;
                    }
                    let k = snap.count as f64;
                    assert!(snap.mean.iter().all(|&m| m == k), "torn mean");
                    assert!(snap.std.iter().all(|&s| s == k + 1.0), "torn std");
                    observed += 1;
                }
                observed
            })
        })
        .collect();

    for k in 1..=2_000_u64 {
        let v = k as f64;
        mirror.sync(k, &vec![v; 64], &vec![v + 1.0; 64]);
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().expect("reader thread panicked");
    }
    assert_eq!(mirror.version(), 2_000);
}
