use std::cmp::Ordering;

use crate::types::{ClassProbabilities, Prediction, RankedDigit};

/// Top three classes by descending confidence. The sort is stable over
/// ascending class indices, so equal confidences keep the lower digit first.
pub fn top3(probabilities: &ClassProbabilities) -> Prediction {
    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| {
        probabilities[b]
            .partial_cmp(&probabilities[a])
            .unwrap_or(Ordering::Equal)
    });

    let ranked = |i: usize| RankedDigit {
        digit: order[i] as u8,
        confidence: probabilities[order[i]],
    };
    Prediction {
        top: [ranked(0), ranked(1), ranked(2)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn picks_highest_three() {
        let p = [0.01, 0.02, 0.5, 0.03, 0.04, 0.2, 0.05, 0.1, 0.03, 0.02];
        let pred = top3(&p);
        let digits: Vec<u8> = pred.top.iter().map(|r| r.digit).collect();
        assert_eq!(digits, vec![2, 5, 7]);
        assert_eq!(pred.best().confidence, 0.5);
    }

    #[test]
    fn ties_break_by_ascending_digit() {
        let pred = top3(&[0.1; 10]);
        let digits: Vec<u8> = pred.top.iter().map(|r| r.digit).collect();
        assert_eq!(digits, vec![0, 1, 2]);

        let mut p = [0.0; 10];
        p[9] = 0.4;
        p[3] = 0.4;
        p[6] = 0.2;
        let digits: Vec<u8> = top3(&p).top.iter().map(|r| r.digit).collect();
        assert_eq!(digits, vec![3, 9, 6]);
    }

    proptest! {
        #[test]
        fn ranking_is_descending_with_ascending_ties(
            levels in proptest::collection::vec(0u8..4, 10)
        ) {
            // Few distinct levels force plenty of ties.
            let mut p = [0f32; 10];
            for (slot, level) in p.iter_mut().zip(&levels) {
                *slot = *level as f32 * 0.1;
            }
            let pred = top3(&p);
            for pair in pred.top.windows(2) {
                prop_assert!(pair[0].confidence >= pair[1].confidence);
                if pair[0].confidence == pair[1].confidence {
                    prop_assert!(pair[0].digit < pair[1].digit);
                }
            }
            let max = p.iter().cloned().fold(f32::MIN, f32::max);
            let first_max = p.iter().position(|&v| v == max).unwrap() as u8;
            prop_assert_eq!(pred.best().digit, first_max);
        }
    }
}
