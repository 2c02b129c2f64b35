//! Test-time augmentation: classify the canvas and a few slightly rotated
//! copies, then average the probability vectors.

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use rayon::prelude::*;
use tracing::debug;

use crate::{
    error::{DigitPrepError, Result},
    traits::DigitClassifier,
    types::{ClassProbabilities, DigitTensor, NUM_CLASSES},
};

/// Rotation angles in degrees, applied in addition to the unrotated canvas.
pub const TTA_ANGLES: [f32; 4] = [-5.0, -3.0, 3.0, 5.0];

/// Rotate about the canvas center with bilinear sampling, keeping the size.
/// Uncovered corners are filled with background.
pub fn rotate(canvas: &GrayImage, degrees: f32) -> GrayImage {
    rotate_about_center(canvas, degrees.to_radians(), Interpolation::Bilinear, Luma([0u8]))
}

/// The unrotated canvas followed by one copy per [`TTA_ANGLES`] entry.
pub fn augmented_views(canvas: &GrayImage) -> Vec<GrayImage> {
    std::iter::once(canvas.clone())
        .chain(TTA_ANGLES.iter().map(|&angle| rotate(canvas, angle)))
        .collect()
}

/// Elementwise arithmetic mean. An empty slice yields all zeros.
pub fn average(predictions: &[ClassProbabilities]) -> ClassProbabilities {
    let mut mean = [0f32; NUM_CLASSES];
    if predictions.is_empty() {
        return mean;
    }
    for p in predictions {
        for (m, v) in mean.iter_mut().zip(p) {
            *m += v;
        }
    }
    let n = predictions.len() as f32;
    mean.iter_mut().for_each(|m| *m /= n);
    mean
}

/// One classifier call with its output checked.
pub fn classify_once(classifier: &dyn DigitClassifier, canvas: &GrayImage) -> Result<ClassProbabilities> {
    let probabilities = classifier.predict(&DigitTensor::from_canvas(canvas)?)?;
    if let Some(class) = probabilities.iter().position(|p| !p.is_finite()) {
        return Err(DigitPrepError::InvalidProbabilities { class });
    }
    Ok(probabilities)
}

/// Classify the canvas once, or over all augmented views when `enable_tta`
/// is set. The views are independent and run on the rayon pool.
pub fn classify(canvas: &GrayImage, classifier: &dyn DigitClassifier, enable_tta: bool) -> Result<ClassProbabilities> {
    if !enable_tta {
        return classify_once(classifier, canvas);
    }

    let views = augmented_views(canvas);
    debug!(views = views.len(), "Running TTA ensemble");
    let predictions = views
        .par_iter()
        .map(|view| classify_once(classifier, view))
        .collect::<Result<Vec<_>>>()?;
    Ok(average(&predictions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Hands out the next vector of a fixed list on every call.
    struct SequenceClassifier {
        outputs: Vec<ClassProbabilities>,
        next: AtomicUsize,
    }

    impl DigitClassifier for SequenceClassifier {
        fn predict(&self, _input: &DigitTensor) -> Result<ClassProbabilities> {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            Ok(self.outputs[i % self.outputs.len()])
        }
    }

    struct RecordingClassifier {
        seen: Mutex<Vec<Vec<f32>>>,
    }

    impl DigitClassifier for RecordingClassifier {
        fn predict(&self, input: &DigitTensor) -> Result<ClassProbabilities> {
            self.seen.lock().unwrap().push(input.as_slice().to_vec());
            Ok([0.1; NUM_CLASSES])
        }
    }

    struct NanClassifier;

    impl DigitClassifier for NanClassifier {
        fn predict(&self, _input: &DigitTensor) -> Result<ClassProbabilities> {
            let mut p = [0.1; NUM_CLASSES];
            p[4] = f32::NAN;
            Ok(p)
        }
    }

    fn one_hot(class: usize, weight: f32) -> ClassProbabilities {
        let rest = (1.0 - weight) / (NUM_CLASSES as f32 - 1.0);
        let mut p = [rest; NUM_CLASSES];
        p[class] = weight;
        p
    }

    fn stroke_canvas() -> GrayImage {
        GrayImage::from_fn(28, 28, |x, y| Luma([if (12..16).contains(&x) && (4..24).contains(&y) { 255 } else { 0 }]))
    }

    #[test]
    fn ensemble_is_exact_mean_of_five_views() {
        let outputs: Vec<ClassProbabilities> = (0..5).map(|i| one_hot(i * 2, 0.6 - i as f32 * 0.05)).collect();
        let classifier = SequenceClassifier { outputs: outputs.clone(), next: AtomicUsize::new(0) };

        let ensembled = classify(&stroke_canvas(), &classifier, true).unwrap();

        assert_eq!(classifier.next.load(Ordering::SeqCst), 5);
        for class in 0..NUM_CLASSES {
            let expected = outputs.iter().map(|p| p[class]).sum::<f32>() / 5.0;
            assert!((ensembled[class] - expected).abs() < 1e-6);
        }
        assert!((ensembled.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn disabled_tta_calls_once() {
        let classifier = SequenceClassifier { outputs: vec![one_hot(7, 0.9)], next: AtomicUsize::new(0) };
        let p = classify(&stroke_canvas(), &classifier, false).unwrap();
        assert_eq!(classifier.next.load(Ordering::SeqCst), 1);
        assert_eq!(p, one_hot(7, 0.9));
    }

    #[test]
    fn views_include_original_and_rotations() {
        let canvas = stroke_canvas();
        let views = augmented_views(&canvas);
        assert_eq!(views.len(), 5);
        assert_eq!(views[0], canvas);
        for view in &views[1..] {
            assert_eq!(view.dimensions(), (28, 28));
            assert_ne!(*view, canvas);
        }
    }

    #[test]
    fn classifier_sees_raw_pixel_range() {
        let classifier = RecordingClassifier { seen: Mutex::new(Vec::new()) };
        classify(&stroke_canvas(), &classifier, true).unwrap();
        let seen = classifier.seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        for tensor in seen.iter() {
            assert_eq!(tensor.len(), 784);
            assert!(tensor.iter().all(|v| (0.0..=255.0).contains(v)));
        }
    }

    #[test]
    fn non_finite_output_is_rejected() {
        let err = classify(&stroke_canvas(), &NanClassifier, false).err().unwrap();
        assert!(matches!(err, DigitPrepError::InvalidProbabilities { class: 4 }));
    }

    #[test]
    fn average_of_nothing_is_zero() {
        assert_eq!(average(&[]), [0.0; NUM_CLASSES]);
    }
}
