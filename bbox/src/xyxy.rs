use super::{Rect, XYWH};
use crate::{common::*, Transform};

/// Bounding box in XYXY format, the corner-to-corner convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XYXY<T> {
    pub(crate) x0: T,
    pub(crate) y0: T,
    pub(crate) x1: T,
    pub(crate) y1: T,
}

impl<T> XYXY<T> {
    pub fn try_cast<V>(self) -> Option<XYXY<V>>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        Some(XYXY {
            x0: V::from(self.x0)?,
            y0: V::from(self.y0)?,
            x1: V::from(self.x1)?,
            y1: V::from(self.y1)?,
        })
    }

    pub fn cast<V>(self) -> XYXY<V>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        self.try_cast().unwrap()
    }
}

impl<T> XYXY<T>
where
    T: Copy + Num,
{
    pub fn transform(&self, transform: &Transform<T>) -> Self {
        XYXY {
            x0: self.x0 * transform.sx + transform.tx,
            y0: self.y0 * transform.sy + transform.ty,
            x1: self.x1 * transform.sx + transform.tx,
            y1: self.y1 * transform.sy + transform.ty,
        }
    }
}

impl<T> Rect for XYXY<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn x0(&self) -> Self::Type {
        self.x0
    }

    fn y0(&self) -> Self::Type {
        self.y0
    }

    fn x1(&self) -> Self::Type {
        self.x1
    }

    fn y1(&self) -> Self::Type {
        self.y1
    }

    fn cx(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.x0 + self.w() / two
    }

    fn cy(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.y0 + self.h() / two
    }

    fn w(&self) -> Self::Type {
        self.x1 - self.x0
    }

    fn h(&self) -> Self::Type {
        self.y1 - self.y0
    }

    fn try_from_xyxy(xyxy: [Self::Type; 4]) -> Result<Self> {
        let [x0, y0, x1, y1] = xyxy;
        ensure!(x1 >= x0 && y1 >= y0, "x1 >= x0 and y1 >= y0 must hold");
        Ok(Self { x0, y0, x1, y1 })
    }

    fn try_from_xywh(xywh: [Self::Type; 4]) -> Result<Self> {
        let [x, y, w, h] = xywh;
        let zero = T::zero();
        ensure!(
            w >= zero && h >= zero,
            "box width and height must be non-negative"
        );
        Self::try_from_xyxy([x, y, x + w, y + h])
    }
}

impl<T> From<XYWH<T>> for XYXY<T>
where
    T: Copy + Num,
{
    fn from(from: XYWH<T>) -> Self {
        Self::from(&from)
    }
}

impl<T> From<&XYWH<T>> for XYXY<T>
where
    T: Copy + Num,
{
    fn from(from: &XYWH<T>) -> Self {
        let XYWH { x, y, w, h } = *from;
        Self {
            x0: x,
            y0: y,
            x1: x + w,
            y1: y + h,
        }
    }
}
