use crate::traits::{DynamicalSystem, Scalar, Steppable};

/// Classic fixed-step Runge-Kutta 4th order stepper.
///
/// Stage buffers are allocated once in [`RK4::new`] and reused for every
/// step, so a full run performs no allocation beyond the caller's output.
/// Stage states are evaluated exactly where the update lands them; nothing
/// is clamped, and a NaN in any stage reaches the stepped state.
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k1: vec![T::zero(); dim],
            k2: vec![T::zero(); dim],
            k3: vec![T::zero(); dim],
            k4: vec![T::zero(); dim],
            tmp: vec![T::zero(); dim],
        }
    }

    pub fn dimension(&self) -> usize {
        self.tmp.len()
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let two = T::one() + T::one();
        let half = T::one() / two;
        let six = two + two + two;

        let t0 = *t;

        // k1 = f(t, y)
        system.apply(t0, state, &mut self.k1);

        // k2 = f(t + dt/2, y + dt*k1/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k1[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k2);

        // k3 = f(t + dt/2, y + dt*k2/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k2[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k3);

        // k4 = f(t + dt, y + dt*k3)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        system.apply(t0 + dt, &self.tmp, &mut self.k4);

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        let weight = dt / six;
        for i in 0..state.len() {
            state[i] = state[i]
                + weight * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *t = t0 + dt;
    }
}

#[cfg(test)]
mod tests {
    use super::RK4;
    use crate::traits::{DynamicalSystem, Steppable};

    struct Decay {
        rate: f64,
    }

    impl DynamicalSystem<f64> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = -self.rate * x[0];
        }
    }

    struct Rotation;

    impl DynamicalSystem<f64> for Rotation {
        fn dimension(&self) -> usize {
            2
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = -x[1];
            out[1] = x[0];
        }
    }

    #[test]
    fn rk4_tracks_exponential_decay() {
        let system = Decay { rate: 0.5 };
        let mut solver = RK4::new(1);
        let mut t = 0.0;
        let mut state = [1.0];
        for _ in 0..1000 {
            solver.step(&system, &mut t, &mut state, 0.01);
        }
        assert!((t - 10.0).abs() < 1e-9);
        assert!((state[0] - (-5.0_f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn rk4_single_step_matches_hand_expansion() {
        // For dx/dt = -x, one RK4 step multiplies by 1 - h + h^2/2 - h^3/6 + h^4/24.
        let system = Decay { rate: 1.0 };
        let mut solver = RK4::new(1);
        let mut t = 0.0;
        let mut state = [2.0];
        let h: f64 = 0.1;
        solver.step(&system, &mut t, &mut state, h);
        let factor = 1.0 - h + h * h / 2.0 - h.powi(3) / 6.0 + h.powi(4) / 24.0;
        assert!((state[0] - 2.0 * factor).abs() < 1e-14);
    }

    #[test]
    fn rk4_conserves_rotation_radius() {
        let system = Rotation;
        let mut solver = RK4::new(2);
        let mut t = 0.0;
        let mut state = [1.0, 0.0];
        let dt = std::f64::consts::TAU / 1000.0;
        for _ in 0..1000 {
            solver.step(&system, &mut t, &mut state, dt);
        }
        assert!((state[0] - 1.0).abs() < 1e-9);
        assert!(state[1].abs() < 1e-9);
    }

    #[test]
    fn rk4_propagates_nan_without_trapping() {
        let system = Rotation;
        let mut solver = RK4::new(2);
        let mut t = 0.0;
        let mut state = [f64::NAN, 1.0];
        solver.step(&system, &mut t, &mut state, 0.1);
        assert!(state[0].is_nan());
        assert!(state[1].is_nan());
        assert_eq!(solver.dimension(), 2);
    }
}
