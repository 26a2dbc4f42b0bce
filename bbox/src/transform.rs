use super::{Rect, XYWH, XYXY};
use crate::{common::*, RectNum, HW};

/// Per-axis scale followed by translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sx: T,
    pub sy: T,
    pub tx: T,
    pub ty: T,
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn from_rects<R>(src: &R, tgt: &R) -> Self
    where
        R: Rect<Type = T>,
    {
        let sx = tgt.w() / src.w();
        let sy = tgt.h() / src.h();
        let tx = tgt.x0() - src.x0() * sx;
        let ty = tgt.y0() - src.y0() * sy;

        Self { sx, sy, tx, ty }
    }

    /// The transform that stretches an image of `src_size` to `tgt_size`.
    pub fn from_sizes_exact(src_size: &HW<T>, tgt_size: &HW<T>) -> Self {
        let src = XYXY::from_xywh([T::zero(), T::zero(), src_size.w(), src_size.h()]);
        let tgt = XYXY::from_xywh([T::zero(), T::zero(), tgt_size.w(), tgt_size.h()]);
        Self::from_rects(&src, &tgt)
    }
}

impl<T> Mul<&XYXY<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = XYXY<T>;

    fn mul(self, rhs: &XYXY<T>) -> Self::Output {
        rhs.transform(self)
    }
}

impl<T> Mul<&XYWH<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = XYWH<T>;

    fn mul(self, rhs: &XYWH<T>) -> Self::Output {
        rhs.transform(self)
    }
}
