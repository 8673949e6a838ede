//! Bin statistics

use std::fmt;

/// Occupancy of one leaf bin.
#[derive(Copy, Clone, Debug)]
pub struct BinOccupancy {
    /// Number of objects contained in the bin.
    pub object_count: usize,

    /// The bin's volume, in the index's coordinate frame. Uniform indices
    /// measure in bin units (volume 1 per bin), so their per-unit-space
    /// average equals their per-bin average.
    pub volume: f64,
}

/// Statistics over the leaf bins of a spatial index, used by the factory to
/// compare candidate indices and reported at info level for diagnostics.
#[derive(Clone, Debug)]
pub struct BinStatistics {
    name: &'static str,
    bins: Vec<BinOccupancy>,
}

impl BinStatistics {
    /// Create statistics from a leaf bin scan.
    ///
    /// * `name` - The index name, for display.
    /// * `bins` - One occupancy entry per leaf bin.
    pub fn new(name: &'static str, bins: Vec<BinOccupancy>) -> Self {
        Self { name, bins }
    }

    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    pub fn empty_bins(&self) -> usize {
        self.bins.iter().filter(|b| b.object_count == 0).count()
    }

    pub fn maximum_objects_per_bin(&self) -> usize {
        self.bins.iter().map(|b| b.object_count).max().unwrap_or(0)
    }

    pub fn average_objects_per_bin(&self) -> f64 {
        self.compute_average_objects_per_bin(true)
    }

    pub fn average_objects_per_non_empty_bin(&self) -> f64 {
        self.compute_average_objects_per_bin(false)
    }

    fn compute_average_objects_per_bin(&self, include_empty_bins: bool) -> f64 {
        let mut sum = 0usize;
        let mut count = 0usize;
        for bin in &self.bins {
            if bin.object_count == 0 {
                if include_empty_bins {
                    count += 1;
                }
            } else {
                sum += bin.object_count;
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            sum as f64 / count as f64
        }
    }

    /// The volume-weighted average number of objects per unit of space.
    pub fn average_objects_per_unit_space(&self) -> f64 {
        let mut weighted_sum = 0.0;
        let mut total_volume = 0.0;
        for bin in &self.bins {
            weighted_sum += bin.volume * bin.object_count as f64;
            total_volume += bin.volume;
        }
        if total_volume == 0.0 {
            0.0
        } else {
            weighted_sum / total_volume
        }
    }

    /// Histogram of objects-per-bin over the non-empty bins.
    ///
    /// * `class_count` - Number of histogram classes.
    pub fn objects_per_bin_histogram(&self, class_count: usize) -> ObjectsPerBinHistogram {
        let class_range_size =
            ((self.maximum_objects_per_bin() as f64 / class_count as f64).ceil() as usize).max(1);
        let mut values = vec![0usize; class_count];
        for bin in &self.bins {
            if bin.object_count > 0 {
                // Excluding empty bins.
                let ci = (bin.object_count / class_range_size).min(class_count - 1);
                values[ci] += 1;
            }
        }
        ObjectsPerBinHistogram {
            class_count,
            class_range_size,
            values,
        }
    }
}

impl fmt::Display for BinStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.bin_count();
        let m = self.empty_bins();
        writeln!(f, "{} statistics {{", self.name)?;
        writeln!(f, "\tBins: {n}")?;
        writeln!(f, "\tEmpty bins: {m}")?;
        writeln!(f, "\tNon-empty bins: {}", n - m)?;
        writeln!(
            f,
            "\tMaximum objects per bin: {}",
            self.maximum_objects_per_bin()
        )?;
        writeln!(
            f,
            "\tAverage objects per bin: {:.2}",
            self.average_objects_per_bin()
        )?;
        writeln!(
            f,
            "\tAverage objects per non-empty bin: {:.2}",
            self.average_objects_per_non_empty_bin()
        )?;
        writeln!(
            f,
            "\tAverage objects per unit space: {:.2}",
            self.average_objects_per_unit_space()
        )?;
        writeln!(
            f,
            "\tHistogram non-empty bins: {}",
            self.objects_per_bin_histogram(20)
                .to_csv_string()
                .replace('\n', "\n\t")
        )?;
        write!(f, "}}")
    }
}

/// Histogram of objects-per-bin counts, grouped into classes of equal range.
#[derive(Clone, Debug)]
pub struct ObjectsPerBinHistogram {
    class_count: usize,
    class_range_size: usize,
    values: Vec<usize>,
}

impl ObjectsPerBinHistogram {
    pub fn class_count(&self) -> usize {
        self.class_count
    }

    pub fn class_range_size(&self) -> usize {
        self.class_range_size
    }

    /// The inclusive lower bound of each class; empty bins are excluded, so
    /// the first class starts at 1.
    pub fn class_lower_bounds(&self) -> Vec<usize> {
        (0..self.class_count)
            .map(|i| (i * self.class_range_size).max(1))
            .collect()
    }

    pub fn class_values(&self) -> &[usize] {
        &self.values
    }

    /// Dump as CSV, one `objects,count` row per class.
    pub fn to_csv_string(&self) -> String {
        let mut csv = String::with_capacity(self.class_count * 8);
        csv.push_str("objects,count\n");
        let lower_bounds = self.class_lower_bounds();
        for (i, lower) in lower_bounds.iter().enumerate() {
            if i > 0 || self.class_range_size > 1 {
                csv.push_str(&format!("{}+,{}\n", lower, self.values[i]));
            }
        }
        csv
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
