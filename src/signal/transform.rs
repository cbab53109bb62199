// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! In-place differentiation and integration of signals sampled every `dt`.

/// Differentiate signal values in place.
///
/// The forward differences `(v[i+1] − v[i]) / dt` are midpoint derivatives;
/// the last value repeats the last difference, then neighbouring midpoint
/// derivatives are averaged (working backwards) so each value is centred on its
/// own sample. Series shorter than 2 become zero.
pub fn differentiate(values: &mut [f64], dt: f64) {
    let n = values.len();
    if n < 2 {
        values.fill(0.0);
        return;
    }

    for i in 0..n - 1 {
        values[i] = (values[i + 1] - values[i]) / dt;
    }
    values[n - 1] = values[n - 2];

    for i in (1..n).rev() {
        values[i] = 0.5 * (values[i] + values[i - 1]);
    }
}

/// Differentiate signal values and their weights in place.
///
/// Each difference gets the weight `w1·w2 / ((w1 + w2)·dt²)`. On the backward
/// pass, neighbouring differences are combined as a weighted average and their
/// weights add. Series shorter than 2 become zero.
pub fn differentiate_weighted(values: &mut [f64], weights: &mut [f64], dt: f64) {
    debug_assert_eq!(values.len(), weights.len());
    let n = values.len();
    if n < 2 {
        values.fill(0.0);
        weights.fill(0.0);
        return;
    }

    let dt2 = dt * dt;
    for i in 0..n - 1 {
        let (w1, w2) = (weights[i], weights[i + 1]);
        let mut w = w1 * w2;
        if w != 0.0 {
            w /= (w1 + w2) * dt2;
        }
        weights[i] = w;
        values[i] = (values[i + 1] - values[i]) / dt;
    }
    values[n - 1] = values[n - 2];
    weights[n - 1] = weights[n - 2];

    // v[i] = (f'[i + 1/2] + f'[i − 1/2]) / 2, weighted.
    for i in (1..n).rev() {
        let (v1, v2) = (values[i], values[i - 1]);
        let (w1, w2) = (weights[i], weights[i - 1]);
        let mut v = w1 * v1 + w2 * v2;
        let w = w1 + w2;
        if w > 0.0 {
            v /= w;
        }
        values[i] = v;
        weights[i] = w;
    }
}

/// Integrate signal values in place with the trapezoid rule. Each value becomes
/// the running integral up to and including its own sample.
pub fn integrate(values: &mut [f64], dt: f64) {
    let mut integral = 0.0;
    let mut half_last = 0.0;
    for v in values.iter_mut() {
        let half_next = 0.5 * *v;
        integral += half_last;
        integral += half_next;
        *v = integral * dt;
        half_last = half_next;
    }
}

/// Integrate signal values and weights in place with the trapezoid rule.
///
/// Each half-interval contributes `v·dt/2` with weight `w / (dt/2)²`;
/// consecutive half-intervals combine their weights harmonically and the
/// result is scaled by `dt²`.
// TODO: Check these weights against the scatter of integrals of simulated
// white noise.
pub fn integrate_weighted(values: &mut [f64], weights: &mut [f64], dt: f64) {
    debug_assert_eq!(values.len(), weights.len());

    let dt2 = dt * dt;
    let idt = 1.0 / dt;
    let half_dt = 0.5 * dt;
    let half_dt2 = half_dt * half_dt;
    let mut integral = 0.0;
    let mut v_last = 0.0;
    let mut w_last = 0.0;

    for (value, weight) in values.iter_mut().zip(weights.iter_mut()) {
        let v_next = *value * half_dt;
        let w_next = *weight / half_dt2;

        let mut w = w_last * w_next;
        if w > 0.0 {
            w /= w_last + w_next;
        } else {
            w = 0.0;
        }

        integral += v_last + v_next;
        *value = integral * idt;
        *weight = w * dt2;
        w_last = w_next;
        v_last = v_next;
    }
}
