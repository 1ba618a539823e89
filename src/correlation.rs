use crate::frame::Frame;

/// Pearson correlation over the rows where both columns are present.
/// `None` when fewer than two such rows exist or either side has no spread.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    let n = pairs.len();
    if n < 2 {
        return None;
    }

    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    // Rounding can push a perfect fit just past the bounds.
    Some(r.clamp(-1.0, 1.0))
}

/// Correlation of every column against `reference`, in column order
/// (the reference column included).
pub fn correlate_against(frame: &Frame, reference: &str) -> Option<Vec<(String, Option<f64>)>> {
    let reference_idx = frame.column_index(reference)?;
    let reference_values = frame.column(reference_idx);

    Some(
        frame
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), pearson(&frame.column(i), &reference_values)))
            .collect(),
    )
}
