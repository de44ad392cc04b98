use rand::Rng;
use rand_distr::{Distribution, Normal};

use stoat_core::{elem, Elem, Error, Initializer, Result, Shape, Tensor};

// Parameter initialization — fills a zeroed parameter buffer according to
// its named initializer.
//
// Xavier scales by fan_in + fan_out, Kaiming by fan_in only. Fan counts
// follow the usual conventions:
//   - 1-D (bias): fan_in = fan_out = d
//   - 2-D (linear weight): fan_in = cols, fan_out = rows
//   - 3-D+ (conv weight): [out_ch, in_ch, *kernel]; the receptive field
//     multiplies both fans.

/// Fill `out` in place from the given initializer.
pub fn initialize(out: &mut Tensor, init: &Initializer) -> Result<()> {
    let mut rng = rand::thread_rng();
    match *init {
        Initializer::Ones => out.fill(elem(1.0)),
        Initializer::Uniform { low, high } => fill_uniform(out, low, high, &mut rng)?,
        Initializer::Normal { mean, std } => fill_normal(out, mean, std, &mut rng)?,
        Initializer::XavierUniform => {
            // U(-a, a) with a = sqrt(6 / (fan_in + fan_out))
            let (fan_in, fan_out) = compute_fans(out.shape());
            let a = (6.0_f64 / (fan_in + fan_out) as f64).sqrt();
            fill_uniform(out, -a, a, &mut rng)?;
        }
        Initializer::XavierNormal => {
            // N(0, std) with std = sqrt(2 / (fan_in + fan_out))
            let (fan_in, fan_out) = compute_fans(out.shape());
            let std = (2.0_f64 / (fan_in + fan_out) as f64).sqrt();
            fill_normal(out, 0.0, std, &mut rng)?;
        }
        Initializer::KaimingUniform => {
            // U(-bound, bound) with bound = sqrt(3 / fan_in)
            let (fan_in, _) = compute_fans(out.shape());
            let bound = (3.0_f64 / fan_in as f64).sqrt();
            fill_uniform(out, -bound, bound, &mut rng)?;
        }
        Initializer::KaimingNormal => {
            // N(0, std) with std = sqrt(2 / fan_in)
            let (fan_in, _) = compute_fans(out.shape());
            let std = (2.0_f64 / fan_in as f64).sqrt();
            fill_normal(out, 0.0, std, &mut rng)?;
        }
    }
    Ok(())
}

fn fill_uniform(out: &mut Tensor, low: f64, high: f64, rng: &mut impl Rng) -> Result<()> {
    if !(low < high) {
        return Err(Error::msg(format!(
            "uniform init: low {} must be below high {}",
            low, high
        )));
    }
    for v in out.data_mut() {
        *v = elem(rng.gen_range(low..high));
    }
    Ok(())
}

fn fill_normal(out: &mut Tensor, mean: f64, std: f64, rng: &mut impl Rng) -> Result<()> {
    let dist = Normal::new(mean, std)
        .map_err(|e| Error::msg(format!("normal init: {}", e)))?;
    for v in out.data_mut() {
        *v = elem(dist.sample(rng));
    }
    Ok(())
}

/// Compute (fan_in, fan_out) from a parameter shape.
pub fn compute_fans(shape: &Shape) -> (usize, usize) {
    let dims = shape.dims();
    match dims.len() {
        0 => (1, 1),
        1 => (dims[0], dims[0]),
        2 => (dims[1], dims[0]),
        _ => {
            // Conv: [out_channels, in_channels, *kernel_size]
            let receptive: usize = dims[2..].iter().product();
            let fan_in = dims[1] * receptive;
            let fan_out = dims[0] * receptive;
            (fan_in, fan_out)
        }
    }
}

/// Helper shared with tests: upper bound of the Xavier-uniform support.
pub fn xavier_uniform_bound(shape: &Shape) -> Elem {
    let (fan_in, fan_out) = compute_fans(shape);
    elem((6.0_f64 / (fan_in + fan_out) as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_fans() {
        assert_eq!(compute_fans(&Shape::from(8)), (8, 8));
        assert_eq!(compute_fans(&Shape::from((4, 16))), (16, 4));
        // Conv weight [out=8, in=3, 5x5]: receptive = 25.
        assert_eq!(compute_fans(&Shape::from((8, 3, 5, 5))), (75, 200));
    }

    #[test]
    fn test_ones() {
        let mut t = Tensor::zeros((2, 3));
        initialize(&mut t, &Initializer::Ones).unwrap();
        assert!(t.data().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_uniform_support() {
        let mut t = Tensor::zeros(512);
        initialize(&mut t, &Initializer::Uniform { low: -0.5, high: 0.5 }).unwrap();
        assert!(t.data().iter().all(|&v| (-0.5..0.5).contains(&(v as f64))));
        // Not all-zero (probability ~0 for 512 draws).
        assert!(t.data().iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_uniform_rejects_empty_range() {
        let mut t = Tensor::zeros(4);
        assert!(initialize(&mut t, &Initializer::Uniform { low: 1.0, high: 1.0 }).is_err());
    }

    #[test]
    fn test_normal_rejects_negative_std() {
        let mut t = Tensor::zeros(4);
        assert!(initialize(&mut t, &Initializer::Normal { mean: 0.0, std: -1.0 }).is_err());
    }

    #[test]
    fn test_xavier_uniform_within_bound() {
        let mut t = Tensor::zeros((16, 16));
        initialize(&mut t, &Initializer::XavierUniform).unwrap();
        let bound = xavier_uniform_bound(t.shape());
        assert!(t.data().iter().all(|&v| v.abs() <= bound));
    }
}
