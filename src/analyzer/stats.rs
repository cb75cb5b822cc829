//! Small statistics helpers over timing samples

/// Arithmetic mean; 0 for an empty slice
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Population variance; 0 for an empty slice
pub fn variance(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let m = mean(samples);
    samples.iter().map(|x| (x - m).powi(2)).sum::<f64>() / samples.len() as f64
}

/// Population standard deviation
pub fn std_dev(samples: &[f64]) -> f64 {
    variance(samples).sqrt()
}

/// Coefficient of variation (sigma over mu); 0 when the mean is 0
pub fn coefficient_of_variation(samples: &[f64]) -> f64 {
    let m = mean(samples);
    if m == 0.0 {
        return 0.0;
    }
    std_dev(samples) / m
}
