use super::{XYWH, XYXY};
use crate::{common::*, HW};

/// The generic rectangle in image coordinates, x grows rightwards and y grows downwards.
pub trait Rect {
    type Type;

    fn x0(&self) -> Self::Type;
    fn y0(&self) -> Self::Type;
    fn x1(&self) -> Self::Type;
    fn y1(&self) -> Self::Type;
    fn cx(&self) -> Self::Type;
    fn cy(&self) -> Self::Type;
    fn w(&self) -> Self::Type;
    fn h(&self) -> Self::Type;

    fn try_from_xyxy(xyxy: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_xywh(xywh: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd,
{
    fn from_xyxy(xyxy: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_xyxy(xyxy).unwrap()
    }

    fn from_xywh(xywh: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_xywh(xywh).unwrap()
    }

    fn xyxy(&self) -> [Self::Type; 4] {
        [self.x0(), self.y0(), self.x1(), self.y1()]
    }

    fn xywh(&self) -> [Self::Type; 4] {
        [self.x0(), self.y0(), self.w(), self.h()]
    }

    fn to_xyxy(&self) -> XYXY<Self::Type> {
        XYXY {
            x0: self.x0(),
            y0: self.y0(),
            x1: self.x1(),
            y1: self.y1(),
        }
    }

    fn to_xywh(&self) -> XYWH<Self::Type> {
        XYWH {
            x: self.x0(),
            y: self.y0(),
            w: self.w(),
            h: self.h(),
        }
    }

    fn area(&self) -> <Self::Type as Mul<Self::Type>>::Output
    where
        Self::Type: Mul<Self::Type>,
    {
        self.h() * self.w()
    }
}

pub trait RectFloat: RectNum
where
    Self::Type: Float,
{
    fn intersect_with<R>(&self, other: &R) -> Option<XYXY<Self::Type>>
    where
        R: Rect<Type = Self::Type>,
    {
        let x0 = self.x0().max(other.x0());
        let y0 = self.y0().max(other.y0());
        let x1 = self.x1().min(other.x1());
        let y1 = self.y1().min(other.y1());
        (x1 > x0 && y1 > y0).then(|| XYXY::from_xyxy([x0, y0, x1, y1]))
    }

    /// Clip the rectangle to the `[0, w] × [0, h]` canvas.
    ///
    /// Returns `None` if nothing is left after clipping.
    fn clip_to(&self, size: &HW<Self::Type>) -> Option<XYXY<Self::Type>> {
        let canvas = XYXY::from_xywh([
            Self::Type::zero(),
            Self::Type::zero(),
            size.w(),
            size.h(),
        ]);
        self.intersect_with(&canvas)
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd,
{
}

impl<T> RectFloat for T
where
    T: Rect,
    T::Type: Float,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rect_disjoint() {
        let lhs = XYXY::from_xyxy([0.0f64, 0.0, 1.0, 1.0]);
        let rhs = XYXY::from_xyxy([2.0f64, 2.0, 3.0, 3.0]);
        assert!(lhs.intersect_with(&rhs).is_none());

        let rhs = XYWH::from_xywh([0.5f64, 0.5, 2.0, 2.0]);
        let inter = lhs.intersect_with(&rhs).unwrap();
        assert_abs_diff_eq!(inter.area(), 0.25);
    }

    #[test]
    fn rect_clip() {
        let rect = XYXY::from_xyxy([-5.0f32, 2.0, 12.0, 8.0]);
        let clipped = rect.clip_to(&HW::from_hw([6.0, 10.0])).unwrap();
        assert_eq!(clipped.xyxy(), [0.0, 2.0, 10.0, 6.0]);

        let outside = XYXY::from_xyxy([20.0f32, 20.0, 30.0, 30.0]);
        assert!(outside.clip_to(&HW::from_hw([6.0, 10.0])).is_none());
    }
}
