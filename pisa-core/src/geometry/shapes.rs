use std::f64::consts::TAU;

use geo::{Coord, Euclidean, Length, LineString, Polygon};

/// Regular polygon with `segments` vertices inscribed in the circle of `radius`
#[allow(clippy::cast_precision_loss)]
pub fn disk(center: Coord<f64>, radius: f64, segments: usize) -> Polygon<f64> {
    let segments = segments.max(3);
    let ring = (0..segments)
        .map(|i| {
            let angle = TAU * i as f64 / segments as f64;
            Coord {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect::<Vec<_>>();

    Polygon::new(LineString::new(ring), Vec::new())
}

/// Planar length of a line
pub fn line_length(line: &LineString<f64>) -> f64 {
    Euclidean.length(line)
}

/// Leading part of `line` covering `fraction` of its planar length
pub fn clip_line(line: &LineString<f64>, fraction: f64) -> LineString<f64> {
    let coords = &line.0;
    if coords.len() < 2 || fraction >= 1.0 {
        return line.clone();
    }

    let start = coords[0];
    let total = line_length(line);
    if fraction <= 0.0 || total == 0.0 {
        return LineString::new(vec![start, start]);
    }

    let target = total * fraction;
    let mut walked = 0.0;
    let mut clipped = vec![start];

    for segment in line.lines() {
        let length = Euclidean.length(&segment);
        if walked + length >= target {
            let t = if length > 0.0 {
                (target - walked) / length
            } else {
                0.0
            };
            clipped.push(Coord {
                x: segment.start.x + t * (segment.end.x - segment.start.x),
                y: segment.start.y + t * (segment.end.y - segment.start.y),
            });
            return LineString::new(clipped);
        }
        walked += length;
        clipped.push(segment.end);
    }

    LineString::new(clipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_follows_vertices() {
        let line = LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0)]);
        let clipped = clip_line(&line, 0.75);

        assert_eq!(
            clipped.0,
            vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 4.0, y: 0.0 },
                Coord { x: 4.0, y: 2.0 }
            ]
        );
    }

    #[test]
    fn clip_bounds() {
        let line = LineString::from(vec![(0.0, 0.0), (4.0, 0.0)]);
        assert_eq!(clip_line(&line, 1.0), line);
        assert_eq!(clip_line(&line, 0.0).0, vec![Coord { x: 0.0, y: 0.0 }; 2]);
        assert_eq!(line_length(&clip_line(&line, 0.25)), 1.0);
    }

    #[test]
    fn length_sums_segments() {
        let line = LineString::from(vec![(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]);
        assert_eq!(line_length(&line), 11.0);
        assert_eq!(line_length(&LineString::new(Vec::new())), 0.0);
    }

    #[test]
    fn clip_walks_diagonal_segments() {
        let line = LineString::from(vec![(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]);
        let clipped = clip_line(&line, 0.5);

        assert!((line_length(&clipped) - 5.5).abs() < 1e-12);
        assert_eq!(clipped.0[1], Coord { x: 3.0, y: 4.0 });
        assert!((clipped.0[2].y - 4.5).abs() < 1e-12);
    }

    #[test]
    fn disk_vertices_lie_on_circle() {
        let polygon = disk(Coord { x: 1.0, y: -1.0 }, 3.0, 16);
        // closed ring: 16 vertices plus the repeated first one
        assert_eq!(polygon.exterior().0.len(), 17);
        for c in &polygon.exterior().0 {
            let r = (c.x - 1.0).hypot(c.y + 1.0);
            assert!((r - 3.0).abs() < 1e-12);
        }
    }
}
