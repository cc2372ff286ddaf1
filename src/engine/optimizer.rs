// Bounded scalar minimization, Brent style.
// ------------------------------------------
// Golden-section steps with successive parabolic interpolation on a closed
// interval. The objective is evaluated as-is; callers fold their own failure
// modes into the returned value so the search always converges.
//
// The absolute tolerance is deliberately coarse for swap sizing: with
// `xatol = 1.0` the returned optimum is within one token base unit of the
// true maximizer, which is as fine as an integer swap amount can be.

const GOLDEN_MEAN: f64 = 0.381_966_011_250_105_2; // (3 - sqrt(5)) / 2
const SQRT_EPS: f64 = 1.490_116_119_384_765_6e-8; // sqrt(f64 machine epsilon)

#[derive(Clone, Copy, Debug)]
pub struct ScalarMinimum {
    /// Argument of the minimum found.
    pub x: f64,
    /// Objective value at `x`.
    pub fun: f64,
    /// Number of objective evaluations spent.
    pub evaluations: u32,
    /// False when the iteration budget ran out before the interval shrank
    /// below tolerance.
    pub converged: bool,
}

#[inline]
fn sign_or_one(v: f64) -> f64 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Minimize `f` over the closed interval `[lower, upper]` to absolute
/// x-tolerance `xatol`.
pub fn minimize_scalar_bounded<F>(
    mut f: F,
    (lower, upper): (f64, f64),
    xatol: f64,
    max_evaluations: u32,
) -> ScalarMinimum
where
    F: FnMut(f64) -> f64,
{
    debug_assert!(lower <= upper);

    let mut a = lower;
    let mut b = upper;

    let mut xf = a + GOLDEN_MEAN * (b - a);
    let mut nfc = xf;
    let mut fulc = xf;

    let mut rat = 0.0_f64;
    let mut e = 0.0_f64;

    let mut fx = f(xf);
    let mut evaluations = 1u32;
    let mut fnfc = fx;
    let mut ffulc = fx;

    let mut xm = 0.5 * (a + b);
    let mut tol1 = SQRT_EPS * xf.abs() + xatol / 3.0;
    let mut tol2 = 2.0 * tol1;

    let mut converged = true;

    while (xf - xm).abs() > tol2 - 0.5 * (b - a) {
        let mut golden = true;

        // try a parabolic fit through the three best points
        if e.abs() > tol1 {
            let r = (xf - nfc) * (fx - ffulc);
            let mut q = (xf - fulc) * (fx - fnfc);
            let mut p = (xf - fulc) * q - (xf - nfc) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            let r_prev = e;
            e = rat;

            if p.abs() < (0.5 * q * r_prev).abs() && p > q * (a - xf) && p < q * (b - xf) {
                golden = false;
                rat = p / q;
                let x = xf + rat;
                if (x - a) < tol2 || (b - x) < tol2 {
                    rat = tol1 * sign_or_one(xm - xf);
                }
            }
        }

        if golden {
            e = if xf >= xm { a - xf } else { b - xf };
            rat = GOLDEN_MEAN * e;
        }

        let x = xf + sign_or_one(rat) * rat.abs().max(tol1);
        let fu = f(x);
        evaluations += 1;

        if fu <= fx {
            if x >= xf {
                a = xf;
            } else {
                b = xf;
            }
            fulc = nfc;
            ffulc = fnfc;
            nfc = xf;
            fnfc = fx;
            xf = x;
            fx = fu;
        } else {
            if x < xf {
                a = x;
            } else {
                b = x;
            }
            if fu <= fnfc || nfc == xf {
                fulc = nfc;
                ffulc = fnfc;
                nfc = x;
                fnfc = fu;
            } else if fu <= ffulc || fulc == xf || fulc == nfc {
                fulc = x;
                ffulc = fu;
            }
        }

        xm = 0.5 * (a + b);
        tol1 = SQRT_EPS * xf.abs() + xatol / 3.0;
        tol2 = 2.0 * tol1;

        if evaluations >= max_evaluations {
            converged = false;
            break;
        }
    }

    ScalarMinimum {
        x: xf,
        fun: fx,
        evaluations,
        converged,
    }
}
