//! Per-event conversion of FADC readout into calibrated hits.
//!
//! Channels are independent, so each event is converted in parallel
//! against one snapshot of the conditions table. A channel without
//! calibration is dropped and counted; the rest of the event goes on.

use crate::calibrator::{HitCalibrator, Mode7Pulse};
use crate::config::FadcConfig;
use crate::fit::PulseFitter;
use crate::integrator::WaveformIntegrator;
use fadcsim_core::{
    CalibratedHit, CalibrationConstants, CalibrationProvider, ChannelId, ChannelTable,
    ConditionsHandle, ConfigError, Error, RawPulse, Result,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Mode-1 readout of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    /// Readout channel.
    pub channel: ChannelId,
    /// ADC samples, 4 ns apart.
    pub samples: Vec<i16>,
}

/// Running pedestal measured for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelPedestal {
    /// Readout channel.
    pub channel: ChannelId,
    /// Pedestal per sample (ADC).
    pub pedestal: f64,
}

/// All FADC readout of one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    /// Mode-1 waveforms.
    pub waveforms: Vec<Waveform>,
    /// Mode-3 pulses.
    pub pulses: Vec<RawPulse>,
    /// Mode-7 pulses.
    pub mode7_pulses: Vec<Mode7Pulse>,
    /// Running pedestals for this event, if measured.
    pub running_pedestals: Option<Vec<ChannelPedestal>>,
}

/// Conversion statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStatistics {
    /// Channels seen.
    pub channels_processed: usize,
    /// Pulses found in Mode-1 waveforms.
    pub pulses_found: usize,
    /// Calibrated hits produced.
    pub hits_produced: usize,
    /// Channels dropped for missing calibration.
    pub channels_dropped: usize,
}

struct ChannelOutput {
    pulses: usize,
    hits: Vec<CalibratedHit>,
}

/// Builder for [`RawConverter`].
#[derive(Default)]
pub struct RawConverterBuilder {
    config: FadcConfig,
    conditions: Option<Arc<ConditionsHandle>>,
    fitter: Option<Arc<dyn PulseFitter>>,
    time_offset: f64,
}

impl RawConverterBuilder {
    /// Set the FADC configuration.
    #[must_use]
    pub fn config(mut self, config: FadcConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the conditions source.
    #[must_use]
    pub fn conditions(mut self, conditions: Arc<ConditionsHandle>) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Set the pulse fitter.
    #[must_use]
    pub fn fitter(mut self, fitter: Arc<dyn PulseFitter>) -> Self {
        self.fitter = Some(fitter);
        self
    }

    /// Set the global time offset added to pre-integrated hits (ns).
    #[must_use]
    pub fn time_offset(mut self, offset: f64) -> Self {
        self.time_offset = offset;
        self
    }

    /// Validate and build the converter.
    pub fn build(self) -> Result<RawConverter> {
        let conditions = self.conditions.ok_or(ConfigError::Missing("conditions"))?;
        if self.config.use_fit && self.fitter.is_none() {
            return Err(ConfigError::Missing("pulse fitter").into());
        }

        let calibrator = HitCalibrator::new(&self.config);
        let running_pedestal = self.config.use_running_pedestal;
        let mut integrator = WaveformIntegrator::new(self.config)?;
        if let Some(fitter) = self.fitter {
            log::debug!("using pulse fitter `{}`", fitter.name());
            integrator = integrator.with_fitter(fitter);
        }

        Ok(RawConverter {
            integrator,
            calibrator,
            conditions,
            time_offset: self.time_offset,
            running_pedestal,
            statistics: ConversionStatistics::default(),
        })
    }
}

/// Converts raw FADC readout into calibrated hits.
pub struct RawConverter {
    integrator: WaveformIntegrator,
    calibrator: HitCalibrator,
    conditions: Arc<ConditionsHandle>,
    time_offset: f64,
    running_pedestal: bool,
    statistics: ConversionStatistics,
}

impl RawConverter {
    /// Start building a converter.
    pub fn builder() -> RawConverterBuilder {
        RawConverterBuilder::default()
    }

    /// The Mode-1 integrator.
    pub fn integrator(&self) -> &WaveformIntegrator {
        &self.integrator
    }

    /// The hit calibrator.
    pub fn calibrator(&self) -> &HitCalibrator {
        &self.calibrator
    }

    /// Statistics accumulated since creation or the last reset.
    pub fn statistics(&self) -> ConversionStatistics {
        self.statistics
    }

    /// Reset accumulated statistics.
    pub fn reset_statistics(&mut self) {
        self.statistics = ConversionStatistics::default();
    }

    /// Converts one event.
    ///
    /// Hits come out in input order: waveforms, then Mode-3, then Mode-7
    /// pulses. Only systemic errors are returned.
    pub fn convert_event(&mut self, event: &RawEvent) -> Result<Vec<CalibratedHit>> {
        let table = self.conditions.snapshot();
        let running = self.running_pedestals(event);
        let running = running.as_ref();

        let integrator = &self.integrator;
        let calibrator = &self.calibrator;
        let time_offset = self.time_offset;

        let mut outcomes: Vec<(ChannelId, Result<ChannelOutput>)> = event
            .waveforms
            .par_iter()
            .map(|waveform| {
                let output = resolve(&table, running, waveform.channel).map(|constants| {
                    let pulses = integrator.find_pulses(&waveform.samples, constants.pedestal);
                    let hits = pulses
                        .iter()
                        .map(|pulse| {
                            calibrator.mode1_hit(
                                waveform.channel,
                                pulse,
                                waveform.samples.len(),
                                &constants,
                            )
                        })
                        .collect();
                    ChannelOutput {
                        pulses: pulses.len(),
                        hits,
                    }
                });
                (waveform.channel, output)
            })
            .collect();

        outcomes.par_extend(event.pulses.par_iter().map(|pulse| {
            let output = resolve(&table, running, pulse.channel).map(|constants| ChannelOutput {
                pulses: 0,
                hits: vec![calibrator.mode3_hit(pulse, time_offset, &constants)],
            });
            (pulse.channel, output)
        }));

        outcomes.par_extend(event.mode7_pulses.par_iter().map(|pulse| {
            let channel = pulse.pulse.channel;
            let output = resolve(&table, running, channel).map(|constants| ChannelOutput {
                pulses: 0,
                hits: vec![calibrator.mode7_hit(pulse, time_offset, &constants)],
            });
            (channel, output)
        }));

        let mut hits = Vec::new();
        for (channel, outcome) in outcomes {
            self.statistics.channels_processed += 1;
            match outcome {
                Ok(output) => {
                    self.statistics.pulses_found += output.pulses;
                    self.statistics.hits_produced += output.hits.len();
                    hits.extend(output.hits);
                }
                Err(Error::ChannelNotFound(_)) => {
                    log::warn!("dropping channel {channel}: no calibration constants");
                    self.statistics.channels_dropped += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(hits)
    }

    fn running_pedestals(&mut self, event: &RawEvent) -> Option<HashMap<ChannelId, f64>> {
        if !self.running_pedestal {
            return None;
        }
        if let Some(pedestals) = &event.running_pedestals {
            Some(pedestals.iter().map(|p| (p.channel, p.pedestal)).collect())
        } else {
            log::warn!(
                "running pedestals requested but not available; reverting to the conditions table for the rest of the run"
            );
            self.running_pedestal = false;
            None
        }
    }
}

fn resolve(
    table: &ChannelTable,
    running: Option<&HashMap<ChannelId, f64>>,
    channel: ChannelId,
) -> Result<CalibrationConstants> {
    let constants = table.constants(channel)?;
    match running {
        Some(pedestals) => match pedestals.get(&channel) {
            Some(&pedestal) => Ok(constants.with_pedestal(pedestal)),
            None => {
                log::warn!("missing running pedestal for channel {channel}");
                Ok(constants)
            }
        },
        None => Ok(constants),
    }
}
