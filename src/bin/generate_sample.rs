//! Writes one synthetic spectrum per supported input layout into the current
//! directory, for trying out `peak-panda run`.

use std::fmt::Write as _;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn generate_spectrum(
    axis: &[f64],
    peaks: &[(f64, f64, f64)],
    noise_level: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    axis.iter()
        .map(|&x| {
            let signal: f64 = peaks
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(x, mu, sigma, amp))
                .sum();
            signal + rng.gauss(0.0, noise_level)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn write_file(path: &str, text: &str, samples: usize) {
    std::fs::write(path, text).unwrap_or_else(|e| panic!("failed to write {path}: {e}"));
    println!("Wrote {samples} samples to {path}");
}

fn main() {
    let mut rng = SimpleRng::new(42);

    // IR: wavenumbers 4000 → 480 cm^-1, stored descending, comma separated.
    let wavenumbers: Vec<f64> = (0..1761).map(|i| 4000.0 - i as f64 * 2.0).collect();
    let absorbance = generate_spectrum(
        &wavenumbers,
        &[
            (3400.0, 80.0, 0.35),
            (2920.0, 15.0, 0.25),
            (1960.0, 10.0, 0.9),
            (1605.0, 8.0, 0.55),
            (1435.0, 6.0, 0.3),
            (745.0, 5.0, 0.45),
        ],
        0.002,
        &mut rng,
    );
    let mut ir = String::from("wavenumber,absorbance\n");
    for (x, y) in wavenumbers.iter().zip(&absorbance) {
        writeln!(ir, "{x:.1},{y:.5}").unwrap();
    }
    write_file("sample_ir.CSV", &ir, wavenumbers.len());

    // MS: isotope envelope around m/z 558, whitespace separated.
    let mz: Vec<f64> = (0..3000).map(|i| 540.0 + i as f64 * 0.01).collect();
    let envelope: Vec<(f64, f64, f64)> = [1.0, 0.62, 0.95, 0.41, 0.18]
        .iter()
        .enumerate()
        .map(|(k, &rel)| (556.0 + k as f64, 0.02, 2.0e4 * rel))
        .collect();
    let intensity = generate_spectrum(&mz, &envelope, 15.0, &mut rng);
    let mut ms = String::from("# m/z    Intensity\n");
    for (x, y) in mz.iter().zip(&intensity) {
        writeln!(ms, "{x:.4}    {:.1}", y.max(0.0)).unwrap();
    }
    write_file("sample_ms.xy", &ms, mz.len());

    // UV-Vis: semicolon separated, comma decimals, spectrometer preamble.
    let wavelengths: Vec<f64> = (0..1201).map(|i| 200.0 + i as f64).collect();
    let uv = generate_spectrum(
        &wavelengths,
        &[(265.0, 12.0, 1.4), (340.0, 25.0, 0.6), (610.0, 40.0, 0.25)],
        0.003,
        &mut rng,
    );
    let mut uv_vis = String::from(
        "UV-Vis export\nSample: demo\nDate: 2024-01-01 12:00\nOperator: lab\n\
         Solvent: DMSO\nCuvette: 10 mm\nScan speed: medium\nMode: Absorbance\n\
         Wave;Absorbance\n[nm];[A.U]\n",
    );
    for (x, y) in wavelengths.iter().zip(&uv) {
        let line = format!("{x:.1};{y:.4}").replace('.', ",");
        writeln!(uv_vis, "{line}").unwrap();
    }
    write_file("sample_uv_vis.TXT", &uv_vis, wavelengths.len());
}
