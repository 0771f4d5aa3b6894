// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

/// A number of months.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Months(u32);

impl Months {
    pub fn new(months: u32) -> Self {
        Self(months)
    }
}

impl From<Months> for u32 {
    fn from(days: Months) -> Self {
        days.0
    }
}

/// A number of days.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Days(u32);

impl Days {
    pub fn new(days: u32) -> Self {
        Self(days)
    }
}

impl From<Days> for u32 {
    fn from(days: Days) -> Self {
        days.0
    }
}

/// A number of milliseconds.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Millis(u32);

impl Millis {
    pub fn new(millis: u32) -> Self {
        Self(millis)
    }
}

impl From<Millis> for u32 {
    fn from(millis: Millis) -> Self {
        millis.0
    }
}

/// An amount of time defined by a number of months, days and milliseconds.
///
/// The wire representation is a `fixed` of 12 bytes: three little-endian
/// unsigned 32-bit integers, in that order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Duration {
    months: Months,
    days: Days,
    millis: Millis,
}

impl Duration {
    /// Construct a new `Duration`.
    pub fn new(months: Months, days: Days, millis: Millis) -> Self {
        Self {
            months,
            days,
            millis,
        }
    }

    /// Returns the number of months in this duration.
    pub fn months(&self) -> Months {
        self.months
    }

    /// Returns the number of days in this duration.
    pub fn days(&self) -> Days {
        self.days
    }

    /// Returns the number of milliseconds in this duration.
    pub fn millis(&self) -> Millis {
        self.millis
    }
}

impl From<Duration> for [u8; 12] {
    fn from(duration: Duration) -> Self {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&duration.months.0.to_le_bytes());
        bytes[4..8].copy_from_slice(&duration.days.0.to_le_bytes());
        bytes[8..12].copy_from_slice(&duration.millis.0.to_le_bytes());
        bytes
    }
}

impl From<[u8; 12]> for Duration {
    fn from(bytes: [u8; 12]) -> Self {
        Self {
            months: Months(u32::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ])),
            days: Days(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]])),
            millis: Millis(u32::from_le_bytes([
                bytes[8], bytes[9], bytes[10], bytes[11],
            ])),
        }
    }
}
