//! Pulse-shape fitting extension point.

/// Result of fitting a pulse shape to a waveform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseFit {
    /// Fit quality; only positive values are trusted.
    pub quality: f64,
    /// Pulse start time (samples).
    pub time0: f64,
    /// Pedestal-free pulse integral (ADC).
    pub integral: f64,
    /// Fitted baseline (ADC).
    pub pedestal: f64,
    /// Maximum of the fitted function (ADC).
    pub maximum: f64,
}

impl PulseFit {
    /// Whether the fit succeeded.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.quality > 0.0
    }
}

/// Fits a pulse shape to a Mode-1 waveform.
///
/// Implementations model the pedestal as a free parameter, so a good fit
/// replaces both the raw integral and the pedestal subtraction.
pub trait PulseFitter: Send + Sync {
    /// Returns the name of the fitter.
    fn name(&self) -> &'static str;

    /// Fits the pulse found at `threshold_crossing`.
    ///
    /// Returns `None` if the pulse was not fitted at all.
    fn fit(&self, samples: &[i16], threshold_crossing: usize, max_adc: f64) -> Option<PulseFit>;
}
