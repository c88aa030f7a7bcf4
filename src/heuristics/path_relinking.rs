//! Path relinking between two job sequences.

/// Walk from `source` towards `target` with insertion moves.
///
/// At each position `i` where the two differ, the job `target[i]` is removed
/// from its current place in the working copy of `source` and reinserted at
/// `i`. Every resulting sequence is recorded; positions that already agree
/// produce nothing. Both slices must be permutations of the same jobs;
/// debug builds panic otherwise.
pub fn path_relinking(source: &[usize], target: &[usize]) -> Vec<Vec<usize>> {
    debug_assert_eq!(source.len(), target.len(), "path relinking between sequences of different length");

    let mut current = source.to_vec();
    let mut path = Vec::new();

    for (i, &job) in target.iter().enumerate().take(current.len()) {
        if current[i] == job {
            continue;
        }

        // positions before i already match target, so the job sits after i
        let Some(from) = current.iter().position(|&x| x == job) else {
            debug_assert!(false, "job {} of the target is missing from the source", job);
            continue;
        };
        current.remove(from);
        current.insert(i, job);
        path.push(current.clone());
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::is_permutation;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_identical_sequences_give_empty_path() {
        assert!(path_relinking(&[2, 0, 1], &[2, 0, 1]).is_empty());
    }

    #[test]
    fn test_insertion_moves() {
        let path = path_relinking(&[0, 1, 2, 3], &[3, 2, 1, 0]);
        assert_eq!(path, vec![
            vec![3, 0, 1, 2],
            vec![3, 2, 0, 1],
            vec![3, 2, 1, 0],
        ]);
    }

    #[test]
    fn test_matching_positions_are_skipped() {
        let path = path_relinking(&[0, 1, 2, 3, 4], &[0, 3, 2, 1, 4]);
        // i=1 inserts 3 -> [0,3,1,2,4]; i=2 inserts 2 -> [0,3,2,1,4]
        assert_eq!(path, vec![vec![0, 3, 1, 2, 4], vec![0, 3, 2, 1, 4]]);
    }

    #[test]
    fn test_source_is_untouched() {
        let source = vec![1, 0, 2];
        let _ = path_relinking(&source, &[2, 1, 0]);
        assert_eq!(source, vec![1, 0, 2]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "different length")]
    fn test_length_mismatch_is_rejected() {
        path_relinking(&[0, 1], &[1, 0, 2]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "missing from the source")]
    fn test_foreign_job_is_rejected() {
        path_relinking(&[0, 1, 2], &[0, 3, 2]);
    }

    #[test]
    fn test_path_properties() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let n = 8;

        for _ in 0..30 {
            let mut source: Vec<usize> = (0..n).collect();
            let mut target: Vec<usize> = (0..n).collect();
            source.shuffle(&mut rng);
            target.shuffle(&mut rng);

            let path = path_relinking(&source, &target);
            assert!(path.len() <= n - 1);
            for step in &path {
                assert!(is_permutation(step, n));
            }
            if let Some(last) = path.last() {
                assert_eq!(last, &target);
            }
        }
    }
}
