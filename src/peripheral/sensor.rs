// Copyright 2026 blehr-uart contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Simulated heart rate source.

/// Heart Rate Measurement flags: sensor contact supported and detected.
pub const SENSOR_CONTACT_DETECTED: u8 = 0x06;

/// First simulated value, and the value restored on reset.
pub const BASELINE_BPM: u8 = 90;

/// The simulated value wraps before reaching this.
pub const UPPER_BPM: u8 = 160;

/// Counter standing in for a real heart rate sensor.
#[derive(Debug, Clone)]
pub struct HeartRateSimulator {
    value: u8,
}

impl HeartRateSimulator {
    pub fn new() -> Self {
        Self { value: BASELINE_BPM }
    }

    /// Return the current value and advance to the next one.
    pub fn next_sample(&mut self) -> u8 {
        let sample = self.value;
        self.value += 1;
        if self.value == UPPER_BPM {
            self.value = BASELINE_BPM;
        }
        sample
    }

    pub fn reset(&mut self) {
        self.value = BASELINE_BPM;
    }

    pub fn current(&self) -> u8 {
        self.value
    }
}

impl Default for HeartRateSimulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Heart Rate Measurement characteristic value with an 8-bit rate.
pub fn measurement_payload(bpm: u8) -> [u8; 2] {
    [SENSOR_CONTACT_DETECTED, bpm]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraparound() {
        let mut sensor = HeartRateSimulator::new();
        let samples: Vec<u8> = (0..71).map(|_| sensor.next_sample()).collect();

        let expected: Vec<u8> = (90..160).chain(std::iter::once(90)).collect();
        assert_eq!(samples, expected);
        assert_eq!(sensor.current(), 91);
    }

    #[test]
    fn test_reset() {
        let mut sensor = HeartRateSimulator::new();
        for _ in 0..15 {
            sensor.next_sample();
        }
        assert_eq!(sensor.current(), 105);

        sensor.reset();
        assert_eq!(sensor.next_sample(), 90);
    }

    #[test]
    fn test_payload() {
        assert_eq!(measurement_payload(72), [0x06, 72]);
    }
}
